use serde::Deserialize;

use crate::kind::DocumentKind;

// ============================================================================
// AMOUNT
// ============================================================================

/// A monetary or count value in the smallest currency unit.
///
/// Deserialization never fails: numbers, numeric strings (with optional
/// grouping commas or a trailing `円`), `null` and missing values are all
/// accepted, and anything non-finite or unparseable becomes zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Amount(f64);

impl Amount {
    pub const ZERO: Amount = Amount(0.0);

    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Amount(value)
        } else {
            Amount::ZERO
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl From<i64> for Amount {
    fn from(v: i64) -> Self {
        Amount::new(v as f64)
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount::new(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |a, b| a + b)
    }
}

// Lenient deserializer: numbers, numeric strings, null, booleans all coerce.
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number, a numeric string or null")
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Amount::new(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Amount::new(v as f64))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Amount::new(v as f64))
            }

            fn visit_bool<E>(self, _v: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Amount::ZERO)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let cleaned: String = v
                    .trim()
                    .trim_end_matches(crate::format::YEN_SUFFIX)
                    .chars()
                    .filter(|c| *c != ',')
                    .collect();
                Ok(cleaned.parse::<f64>().map(Amount::new).unwrap_or_default())
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Amount::ZERO)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Amount::ZERO)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_any(AmountVisitor)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

// ============================================================================
// PARTIES
// ============================================================================

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BankAccount {
    pub bank_name: String,
    pub branch: String,
    pub account_type: String,
    pub account_number: String,
    pub account_holder: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IssuerInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub representative: String,
    /// Logo image source: data URL, http(s) URL or local path
    pub logo: Option<String>,
    pub bank_account: Option<BankAccount>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipientInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
}

// ============================================================================
// VEHICLES
// ============================================================================

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectVehicle {
    pub maker: String,
    pub model_name: String,
    pub grade: String,
    pub model_code: String,
    pub year: String,
    pub mileage: Amount,
    pub color: String,
    pub displacement: Amount,
    pub transmission: String,
    pub accident_history: bool,
    pub inspection_expiry: String,
    pub unit_price: Amount,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeInVehicle {
    pub name: String,
    pub registration_number: String,
    pub mileage: Amount,
    pub first_registration: String,
    pub inspection_expiry: String,
    pub chassis_number: String,
    pub color: String,
    pub appraised_price: Amount,
}

// ============================================================================
// LOAN
// ============================================================================

/// Installment plan terms.
///
/// `bonus_months` and `bonus_amount` are rendered as given; a month list with
/// a zero amount prints `0円` against the listed months.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LoanTerms {
    pub down_payment: Amount,
    pub principal: Amount,
    pub finance_charge: Amount,
    pub total_payable: Amount,
    pub installment_count: Amount,
    pub term_months: Amount,
    pub first_installment: Amount,
    pub subsequent_installment: Amount,
    pub bonus_months: Vec<u32>,
    pub bonus_amount: Amount,
}

// ============================================================================
// LINE ITEMS AND FEES
// ============================================================================

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessory {
    pub name: String,
    pub price: Amount,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxInsurance {
    pub automobile_tax: Amount,
    pub environmental_performance_tax: Amount,
    pub weight_tax: Amount,
    pub liability_insurance: Amount,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LegalFees {
    pub inspection_registration_stamp: Amount,
    pub garage_certificate_stamp: Amount,
    pub recycling_deposit: Amount,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingFees {
    pub inspection_registration_fee: Amount,
    pub garage_certificate_fee: Amount,
    pub delivery_fee: Amount,
    pub trade_in_processing_fee: Amount,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesBreakdown {
    pub vehicle_price: Amount,
    pub accessories_total: Amount,
    pub discount: Amount,
    pub consumption_tax: Amount,
    pub subtotal: Amount,
    pub trade_in_price: Amount,
    pub trade_in_debt: Amount,
    pub total_payment: Amount,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeBreakdown {
    pub tax_insurance: TaxInsurance,
    pub legal_fees: LegalFees,
    pub processing_fees: ProcessingFees,
    pub sales_breakdown: SalesBreakdown,
}

impl TaxInsurance {
    pub fn rows(&self) -> [(&'static str, Amount); 4] {
        [
            ("自動車税（種別割）", self.automobile_tax),
            ("環境性能割", self.environmental_performance_tax),
            ("自動車重量税", self.weight_tax),
            ("自賠責保険料", self.liability_insurance),
        ]
    }
}

impl LegalFees {
    pub fn rows(&self) -> [(&'static str, Amount); 3] {
        [
            ("検査登録印紙代", self.inspection_registration_stamp),
            ("車庫証明印紙代", self.garage_certificate_stamp),
            ("リサイクル預託金", self.recycling_deposit),
        ]
    }
}

impl ProcessingFees {
    pub fn rows(&self) -> [(&'static str, Amount); 4] {
        [
            ("検査登録手続代行費用", self.inspection_registration_fee),
            ("車庫証明手続代行費用", self.garage_certificate_fee),
            ("納車費用", self.delivery_fee),
            ("下取車手続代行費用", self.trade_in_processing_fee),
        ]
    }
}

impl SalesBreakdown {
    pub fn rows(&self) -> [(&'static str, Amount); 8] {
        [
            ("車両本体価格", self.vehicle_price),
            ("付属品価格", self.accessories_total),
            ("値引き", self.discount),
            ("消費税", self.consumption_tax),
            ("小計", self.subtotal),
            ("下取車価格", self.trade_in_price),
            ("下取車残債", self.trade_in_debt),
            ("お支払総額", self.total_payment),
        ]
    }
}

// ============================================================================
// DOCUMENT RECORD
// ============================================================================

/// The complete data for one quote, invoice or order.
///
/// Produced by the business layer; the print pipeline only reads it.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub document_kind: DocumentKind,
    #[serde(default)]
    pub document_number: String,
    #[serde(default)]
    pub document_date: String,
    #[serde(default)]
    pub issuer_info: IssuerInfo,
    #[serde(default)]
    pub recipient_info: RecipientInfo,
    #[serde(default)]
    pub subject_vehicle: SubjectVehicle,
    #[serde(default)]
    pub trade_in_vehicle: Option<TradeInVehicle>,
    #[serde(default)]
    pub loan_terms: Option<LoanTerms>,
    #[serde(default)]
    pub line_item_accessories: Vec<Accessory>,
    #[serde(default)]
    pub fee_breakdown: FeeBreakdown,
    #[serde(default)]
    pub remarks: String,
}

impl DocumentRecord {
    /// An otherwise empty record of the given kind.
    pub fn empty(kind: DocumentKind) -> Self {
        DocumentRecord {
            document_kind: kind,
            document_number: String::new(),
            document_date: String::new(),
            issuer_info: IssuerInfo::default(),
            recipient_info: RecipientInfo::default(),
            subject_vehicle: SubjectVehicle::default(),
            trade_in_vehicle: None,
            loan_terms: None,
            line_item_accessories: Vec::new(),
            fee_breakdown: FeeBreakdown::default(),
            remarks: String::new(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.document_kind
    }
}
