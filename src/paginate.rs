//! Splitting a rendered document into page-sized fragments.
//!
//! Each fragment is captured in its own offscreen container, strictly one
//! after the other, and becomes exactly one PDF page.

use crate::capture::CaptureEngine;
use crate::error::CaptureError;
use crate::host::HostDocument;
use crate::kind::{DocumentKind, ROOT_SELECTOR};
use crate::raster::Bitmap;

/// Fragment selectors for a kind, in page order.
pub fn plan(kind: DocumentKind) -> &'static [&'static str] {
    kind.profile().fragments
}

/// Capture every planned fragment of `markup`.
///
/// A missing first fragment falls back to the whole document root. A missing
/// later fragment is skipped so the export still yields the pages it has.
pub async fn capture_fragments(
    engine: &CaptureEngine,
    host: &mut HostDocument,
    kind: DocumentKind,
    markup: &str,
) -> Result<Vec<Bitmap>, CaptureError> {
    let selectors = plan(kind);
    let mut fragments = Vec::with_capacity(selectors.len());

    for (index, selector) in selectors.iter().enumerate() {
        match engine.capture(host, markup, selector).await {
            Ok(bitmap) => fragments.push(bitmap),
            Err(CaptureError::TargetNotFound(_)) if index == 0 => {
                tracing::warn!(kind = %kind, selector, "body fragment missing, capturing document root");
                fragments.push(engine.capture(host, markup, ROOT_SELECTOR).await?);
            }
            Err(CaptureError::TargetNotFound(_)) => {
                tracing::warn!(kind = %kind, selector, "fragment missing, continuing without it");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(kind = %kind, fragments = fragments.len(), "document paginated");
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::RecordingRasterizer;
    use crate::kind::{BODY_SELECTOR, TERMS_SELECTOR};
    use crate::layout::MarkupNode;
    use std::sync::Arc;

    fn engine(raster: &Arc<RecordingRasterizer>) -> CaptureEngine {
        CaptureEngine::new(raster.clone())
    }

    fn seen(raster: &RecordingRasterizer) -> Vec<Option<String>> {
        raster.seen.lock().unwrap().clone()
    }

    fn id(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_plan_per_kind() {
        assert_eq!(plan(DocumentKind::Quote), &[BODY_SELECTOR]);
        assert_eq!(plan(DocumentKind::Invoice), &[BODY_SELECTOR]);
        assert_eq!(plan(DocumentKind::Order), &[BODY_SELECTOR, TERMS_SELECTOR]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_captures_body_then_terms() {
        let raster = Arc::new(RecordingRasterizer::default());
        let markup = MarkupNode::view()
            .with_id("document-root")
            .child(MarkupNode::view().with_id("document-body"))
            .child(MarkupNode::view().with_id("order-terms"))
            .to_markup();
        let mut host = HostDocument::new();

        let fragments = capture_fragments(&engine(&raster), &mut host, DocumentKind::Order, &markup)
            .await
            .unwrap();

        assert_eq!(fragments.len(), 2);
        assert_eq!(seen(&raster), vec![id("document-body"), id("order-terms")]);
        assert!(host.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_terms_keeps_body() {
        let raster = Arc::new(RecordingRasterizer::default());
        let markup = MarkupNode::view()
            .with_id("document-root")
            .child(MarkupNode::view().with_id("document-body"))
            .to_markup();
        let mut host = HostDocument::new();

        let fragments = capture_fragments(&engine(&raster), &mut host, DocumentKind::Order, &markup)
            .await
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(seen(&raster), vec![id("document-body")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_body_falls_back_to_root() {
        let raster = Arc::new(RecordingRasterizer::default());
        let markup = MarkupNode::view().with_id("document-root").to_markup();
        let mut host = HostDocument::new();

        let fragments = capture_fragments(&engine(&raster), &mut host, DocumentKind::Quote, &markup)
            .await
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(seen(&raster), vec![id("document-root")]);
        assert!(host.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_body_and_root_fails() {
        let raster = Arc::new(RecordingRasterizer::default());
        let markup = MarkupNode::view().to_markup();
        let mut host = HostDocument::new();

        let err = capture_fragments(&engine(&raster), &mut host, DocumentKind::Invoice, &markup)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::TargetNotFound(ref s) if s == ROOT_SELECTOR));
        assert!(host.is_empty());
    }
}
