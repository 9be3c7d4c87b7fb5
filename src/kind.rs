//! Document kinds and the per-kind profile table.
//!
//! The template renderer and the pagination splitter both read
//! [`DocumentKind::profile`]; nothing else branches on the kind.

use serde::{Deserialize, Serialize};

/// Selector of the main document body fragment.
pub const BODY_SELECTOR: &str = "#document-body";
/// Selector of the legal-terms fragment printed as its own page.
pub const TERMS_SELECTOR: &str = "#order-terms";
/// Selector of the whole rendered document.
pub const ROOT_SELECTOR: &str = "#document-root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Quote,
    Invoice,
    Order,
}

/// Body sections, in the order a profile lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Parties,
    Vehicle,
    TradeIn,
    Accessories,
    Fees,
    Summary,
    Loan,
    BankAccount,
    Remarks,
    Signature,
}

#[derive(Debug)]
pub struct KindProfile {
    /// Human-readable name, also the download filename prefix
    pub label: &'static str,
    /// Sentence printed under the title
    pub lead: &'static str,
    /// Caption for the amount shown in the header box
    pub total_caption: &'static str,
    pub sections: &'static [Section],
    /// Selectors captured one per physical page, in page order
    pub fragments: &'static [&'static str],
    pub has_terms: bool,
}

static QUOTE: KindProfile = KindProfile {
    label: "見積書",
    lead: "下記の通りお見積り申し上げます。",
    total_caption: "お見積金額",
    sections: &[
        Section::Parties,
        Section::Vehicle,
        Section::Accessories,
        Section::Fees,
        Section::Summary,
        Section::TradeIn,
        Section::Loan,
        Section::Remarks,
    ],
    fragments: &[BODY_SELECTOR],
    has_terms: false,
};

static INVOICE: KindProfile = KindProfile {
    label: "請求書",
    lead: "下記の通りご請求申し上げます。",
    total_caption: "ご請求金額",
    sections: &[
        Section::Parties,
        Section::Vehicle,
        Section::Summary,
        Section::Fees,
        Section::Accessories,
        Section::BankAccount,
        Section::Remarks,
    ],
    fragments: &[BODY_SELECTOR],
    has_terms: false,
};

static ORDER: KindProfile = KindProfile {
    label: "注文書",
    lead: "裏面記載の約款を承認の上、下記の通り注文いたします。",
    total_caption: "お支払総額",
    sections: &[
        Section::Parties,
        Section::Vehicle,
        Section::TradeIn,
        Section::Accessories,
        Section::Fees,
        Section::Summary,
        Section::Loan,
        Section::Remarks,
        Section::Signature,
    ],
    fragments: &[BODY_SELECTOR, TERMS_SELECTOR],
    has_terms: true,
};

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Quote, DocumentKind::Invoice, DocumentKind::Order];

    pub fn profile(self) -> &'static KindProfile {
        match self {
            DocumentKind::Quote => &QUOTE,
            DocumentKind::Invoice => &INVOICE,
            DocumentKind::Order => &ORDER,
        }
    }

    pub fn label(self) -> &'static str {
        self.profile().label
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Invoice => "invoice",
            DocumentKind::Order => "order",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(DocumentKind::Quote.label(), "見積書");
        assert_eq!(DocumentKind::Invoice.label(), "請求書");
        assert_eq!(DocumentKind::Order.label(), "注文書");
    }

    #[test]
    fn test_fragments_start_with_body() {
        for kind in DocumentKind::ALL {
            assert_eq!(kind.profile().fragments[0], BODY_SELECTOR);
            assert_eq!(kind.profile().has_terms, kind.profile().fragments.contains(&TERMS_SELECTOR));
        }
    }

    #[test]
    fn test_serde_names() {
        let kind: DocumentKind = serde_json::from_str("\"order\"").unwrap();
        assert_eq!(kind, DocumentKind::Order);
        assert_eq!(serde_json::to_string(&DocumentKind::Quote).unwrap(), "\"quote\"");
    }
}
