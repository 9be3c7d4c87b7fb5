//! The on-screen preview of one document and its download action.

use crate::capture::CaptureEngine;
use crate::error::{EnvironmentError, ExportError};
use crate::host::{HostDocument, NodeId, Placement};
use crate::layout::MarkupNode;
use crate::paginate;
use crate::pdf::{self, DownloadSink, PdfFile};
use crate::record::DocumentRecord;
use crate::template::{self, RenderMode};

#[derive(Debug)]
struct OpenDocument {
    record: DocumentRecord,
    node: NodeId,
}

/// Shows a record in screen mode and exports it to PDF on request.
///
/// `download` borrows the surface mutably, so one surface never runs two
/// exports at once.
#[derive(Debug)]
pub struct PreviewSurface {
    host: HostDocument,
    engine: CaptureEngine,
    open: Option<OpenDocument>,
}

impl PreviewSurface {
    pub fn new(engine: CaptureEngine) -> Self {
        PreviewSurface { host: HostDocument::new(), engine, open: None }
    }

    /// Show `record`, replacing whatever was open. Returns the screen markup.
    pub fn open(&mut self, record: DocumentRecord) -> String {
        self.close();

        let markup = template::build_document(&record, RenderMode::Screen);
        let serialized = markup.to_markup();
        let node = self.host.attach(markup, Placement::Visible);
        tracing::debug!(kind = %record.kind(), "preview opened");

        self.open = Some(OpenDocument { record, node });
        serialized
    }

    pub fn close(&mut self) {
        if let Some(doc) = self.open.take() {
            self.host.detach(doc.node);
            tracing::debug!(kind = %doc.record.kind(), "preview closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn record(&self) -> Option<&DocumentRecord> {
        self.open.as_ref().map(|d| &d.record)
    }

    /// The visible preview tree, if a record is open.
    pub fn screen(&self) -> Option<&MarkupNode> {
        self.open.as_ref().and_then(|d| self.host.get(d.node)).map(|n| &n.tree)
    }

    pub fn host(&self) -> &HostDocument {
        &self.host
    }

    /// Render the open record for print, capture its fragments and assemble the PDF.
    pub async fn export(&mut self) -> Result<PdfFile, ExportError> {
        let record = self
            .open
            .as_ref()
            .map(|d| &d.record)
            .ok_or_else(|| EnvironmentError::DownloadUnavailable("no document is open".into()))?;

        let kind = record.kind();
        let markup = template::render(record, RenderMode::Print);
        let number = record.document_number.clone();

        let fragments = paginate::capture_fragments(&self.engine, &mut self.host, kind, &markup).await?;
        let file = pdf::assemble(&fragments, kind.label(), &number)?;

        tracing::info!(kind = %kind, pages = file.page_count, bytes = file.bytes.len(), "pdf assembled");
        Ok(file)
    }

    /// Export the open record and hand the file to `sink`.
    ///
    /// On failure the error is logged and returned; callers show
    /// [`ExportError::user_message`] and may retry.
    pub async fn download(&mut self, sink: &dyn DownloadSink) -> Result<PdfFile, ExportError> {
        let result = async {
            let file = self.export().await?;
            sink.deliver(&file)?;
            Ok::<_, ExportError>(file)
        }
        .await;

        if let Err(e) = &result {
            tracing::error!(error = %e, retryable = e.is_retryable(), "pdf download failed");
        }
        result
    }
}

impl Default for PreviewSurface {
    fn default() -> Self {
        PreviewSurface::new(CaptureEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::RecordingRasterizer;
    use crate::error::{CaptureError, RETRY_MESSAGE};
    use crate::images::ImageSet;
    use crate::raster::{Bitmap, Rasterizer, SkiaRasterizer};
    use crate::kind::DocumentKind;
    use crate::record::{Accessory, Amount};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct MemorySink {
        files: Mutex<Vec<(String, usize)>>,
    }

    impl DownloadSink for MemorySink {
        fn deliver(&self, file: &PdfFile) -> Result<(), EnvironmentError> {
            self.files.lock().unwrap().push((file.filename().to_string(), file.page_count));
            Ok(())
        }
    }

    struct BrokenSink;

    impl DownloadSink for BrokenSink {
        fn deliver(&self, _: &PdfFile) -> Result<(), EnvironmentError> {
            Err(EnvironmentError::DownloadUnavailable("read-only".into()))
        }
    }

    fn surface(raster: &Arc<RecordingRasterizer>) -> PreviewSurface {
        PreviewSurface::new(CaptureEngine::new(raster.clone()).with_settle(Duration::from_millis(10)))
    }

    fn record(kind: DocumentKind, number: &str) -> DocumentRecord {
        let mut record = DocumentRecord::empty(kind);
        record.document_number = number.to_string();
        record
    }

    #[test]
    fn test_open_attaches_visible_screen_markup() {
        let mut surface = PreviewSurface::default();
        let markup = surface.open(record(DocumentKind::Quote, "Q-1"));

        assert!(surface.is_open());
        assert_eq!(surface.host().len(), 1);
        assert_eq!(surface.host().offscreen_count(), 0);
        assert_eq!(surface.screen().unwrap().to_markup(), markup);
        assert!(markup.contains("見積書"));
    }

    #[test]
    fn test_open_replaces_and_close_detaches() {
        let mut surface = PreviewSurface::default();
        surface.open(record(DocumentKind::Quote, "Q-1"));
        surface.open(record(DocumentKind::Invoice, "I-1"));
        assert_eq!(surface.host().len(), 1);
        assert_eq!(surface.record().unwrap().document_number, "I-1");

        surface.close();
        assert!(!surface.is_open());
        assert!(surface.host().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_downloads_single_page() {
        let raster = Arc::new(RecordingRasterizer::default());
        let mut surface = surface(&raster);
        let mut quote = record(DocumentKind::Quote, "EST-0001");
        quote.line_item_accessories = vec![Accessory { name: "フロアマット".into(), price: Amount::new(25_000.0) }];
        surface.open(quote);

        let sink = MemorySink::default();
        let file = surface.download(&sink).await.unwrap();

        assert_eq!(file.page_count, 1);
        assert_eq!(*sink.files.lock().unwrap(), vec![("見積書_EST-0001.pdf".to_string(), 1)]);
        assert_eq!(*raster.seen.lock().unwrap(), vec![Some("document-body".to_string())]);
        // Only the visible preview remains
        assert_eq!(surface.host().len(), 1);
        assert_eq!(surface.host().offscreen_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoice_filename() {
        let raster = Arc::new(RecordingRasterizer::default());
        let mut surface = surface(&raster);
        surface.open(record(DocumentKind::Invoice, "EST-0001"));
        let file = surface.export().await.unwrap();
        assert_eq!(file.filename(), "請求書_EST-0001.pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_order_puts_terms_on_second_page() {
        let raster = Arc::new(RecordingRasterizer::default());
        let mut surface = surface(&raster);
        let mut order = record(DocumentKind::Order, "ORD-42");
        order.line_item_accessories = (0..40)
            .map(|i| Accessory { name: format!("用品{}", i), price: Amount::new(1000.0) })
            .collect();
        surface.open(order);

        let file = surface.export().await.unwrap();

        assert_eq!(file.page_count, 2);
        assert_eq!(
            *raster.seen.lock().unwrap(),
            vec![Some("document-body".to_string()), Some("order-terms".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_is_not_retryable() {
        let raster = Arc::new(RecordingRasterizer::default());
        let mut surface = surface(&raster);
        surface.open(record(DocumentKind::Quote, "Q-9"));

        let err = surface.download(&BrokenSink).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), RETRY_MESSAGE);
        assert!(surface.is_open());
    }

    #[tokio::test]
    async fn test_order_through_skia_rasterizer() {
        let engine = CaptureEngine::default().with_settle(Duration::ZERO).with_scale(0.25);
        let mut surface = PreviewSurface::new(engine);
        surface.open(record(DocumentKind::Order, "ORD-1"));

        let file = surface.export().await.unwrap();
        assert_eq!(file.page_count, 2);
        assert_eq!(file.filename(), "注文書_ORD-1.pdf");
        assert!(file.bytes.starts_with(b"%PDF"));
    }

    /// Paints with the real rasterizer and records what it produced.
    #[derive(Default)]
    struct PaintedFragments {
        seen: Mutex<Vec<(Option<String>, u32, u32)>>,
    }

    impl Rasterizer for PaintedFragments {
        fn rasterize(&self, target: &MarkupNode, images: &ImageSet, scale: f32) -> Result<Bitmap, CaptureError> {
            let bitmap = SkiaRasterizer.rasterize(target, images, scale)?;
            self.seen.lock().unwrap().push((target.id.clone(), bitmap.width, bitmap.height));
            Ok(bitmap)
        }
    }

    #[tokio::test]
    async fn test_order_body_taller_than_raster_limit_still_exports() {
        let painted = Arc::new(PaintedFragments::default());
        let engine = CaptureEngine::new(painted.clone()).with_settle(Duration::ZERO);
        assert_eq!(engine.scale(), crate::capture::DEFAULT_SCALE);
        let mut surface = PreviewSurface::new(engine);

        let mut order = record(DocumentKind::Order, "ORD-500");
        order.line_item_accessories = (0..500)
            .map(|i| Accessory { name: format!("用品{}", i), price: Amount::new(1000.0) })
            .collect();
        surface.open(order);

        let file = surface.export().await.unwrap();
        assert_eq!(file.page_count, 2);

        let seen = painted.seen.lock().unwrap();
        let ids: Vec<_> = seen.iter().map(|(id, _, _)| id.as_deref()).collect();
        assert_eq!(ids, vec![Some("document-body"), Some("order-terms")]);

        // The body alone is far longer than one edge of default-scale pixels
        let (_, body_w, body_h) = seen[0];
        assert!(body_h > 8_000, "body height {body_h}");
        assert!(body_h > body_w * 5, "body {body_w}x{body_h}");
        assert_eq!(surface.host().offscreen_count(), 0);
    }

    #[tokio::test]
    async fn test_download_without_open_record_fails() {
        let mut surface = PreviewSurface::default();
        let err = surface.download(&MemorySink::default()).await.unwrap_err();
        assert!(matches!(err, ExportError::Environment(_)));
    }
}
