//! Document template renderer.
//!
//! Turns a [`DocumentRecord`] into markup for either the live preview or the
//! print capture. Both modes produce the same structure; print mode pins every
//! dimension to A4 points so the capture is dimensionally exact.

use crate::format;
use crate::kind::{KindProfile, Section, BODY_SELECTOR, ROOT_SELECTOR, TERMS_SELECTOR};
use crate::layout::{
    BorderSide, Color, CrossAlign, Dimension, FontWeight, MainAlign, MarkupNode, NodeType, ObjectFit,
    TextAlign,
};
use crate::record::{Amount, DocumentRecord, LoanTerms, TradeInVehicle};
use crate::terms::{ORDER_TERMS, TERMS_TITLE};

/// A4 width in points.
pub const A4_WIDTH_PT: f32 = 595.28;
/// A4 height in points.
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Accessory tables always show at least this many rows.
pub const ACCESSORY_MIN_ROWS: usize = 5;

const TEXT_COLOR: Color = Color::rgb(0x22, 0x22, 0x22);
const RULE_COLOR: Color = Color::rgb(0x88, 0x88, 0x88);
const LABEL_BG: Color = Color::rgb(0xEE, 0xF2, 0xF7);
const ACCENT: Color = Color::rgb(0x1F, 0x3A, 0x5F);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Fluid layout for the live preview
    Screen,
    /// Fixed A4 layout for capture
    Print,
}

/// Per-mode sizing. Print values are points; screen values are CSS-like pixels.
#[derive(Debug, Clone, Copy)]
struct Theme {
    width: Dimension,
    max_width: Option<Dimension>,
    min_height: Option<Dimension>,
    padding: f32,
    gap: f32,
    title_size: f32,
    heading_size: f32,
    body_size: f32,
    small_size: f32,
    terms_size: f32,
    cell_padding: f32,
    rule: f32,
    logo_height: f32,
    remarks_height: f32,
    seal_height: f32,
}

impl Theme {
    fn for_mode(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Print => Theme {
                width: Dimension::Pt(A4_WIDTH_PT),
                max_width: None,
                min_height: Some(Dimension::Pt(A4_HEIGHT_PT)),
                padding: 28.35,
                gap: 7.0,
                title_size: 20.0,
                heading_size: 9.0,
                body_size: 7.5,
                small_size: 6.5,
                terms_size: 6.5,
                cell_padding: 2.2,
                rule: 0.5,
                logo_height: 28.0,
                remarks_height: 36.0,
                seal_height: 52.0,
            },
            RenderMode::Screen => Theme {
                width: Dimension::Percent(100.0),
                max_width: Some(Dimension::Pt(820.0)),
                min_height: None,
                padding: 24.0,
                gap: 12.0,
                title_size: 26.0,
                heading_size: 13.0,
                body_size: 11.0,
                small_size: 10.0,
                terms_size: 9.5,
                cell_padding: 4.0,
                rule: 1.0,
                logo_height: 40.0,
                remarks_height: 56.0,
                seal_height: 72.0,
            },
        }
    }

    fn rule(&self) -> BorderSide {
        BorderSide { width: self.rule, color: RULE_COLOR }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Render a record to markup. Identical input and mode give identical output.
pub fn render(record: &DocumentRecord, mode: RenderMode) -> String {
    build_document(record, mode).to_markup()
}

/// Build the markup tree without serializing it.
pub fn build_document(record: &DocumentRecord, mode: RenderMode) -> MarkupNode {
    let theme = Theme::for_mode(mode);
    let profile = record.kind().profile();

    let mut root = MarkupNode::view().with_id(id_of(ROOT_SELECTOR)).styled(|s| {
        s.width = Some(theme.width);
        s.max_width = theme.max_width;
        s.gap = if mode == RenderMode::Screen { Some(theme.gap * 2.0) } else { None };
    });

    root = root.child(body(record, profile, &theme));
    if profile.has_terms {
        root = root.child(terms_page(&theme));
    }
    root
}

fn id_of(selector: &str) -> &str {
    selector.trim_start_matches('#')
}

// ============================================================================
// PAGES
// ============================================================================

fn page(theme: &Theme, id: &str) -> MarkupNode {
    MarkupNode::view().with_id(id).styled(|s| {
        s.width = Some(theme.width);
        s.max_width = theme.max_width;
        s.min_height = theme.min_height;
        s.padding = Some(theme.padding);
        s.gap = Some(theme.gap);
        s.background_color = Some(Color::white());
        s.color = Some(TEXT_COLOR);
    })
}

fn body(record: &DocumentRecord, profile: &KindProfile, theme: &Theme) -> MarkupNode {
    let mut node = page(theme, id_of(BODY_SELECTOR)).child(header(record, profile, theme));

    for section in profile.sections {
        let rendered = match section {
            Section::Parties => parties(record, theme),
            Section::Vehicle => vehicle(record, theme),
            Section::TradeIn => trade_in(record.trade_in_vehicle.as_ref(), theme),
            Section::Accessories => accessories(record, theme),
            Section::Fees => fees(record, theme),
            Section::Summary => summary(record, theme),
            Section::Loan => loan(record.loan_terms.as_ref(), theme),
            Section::BankAccount => bank_account(record, theme),
            Section::Remarks => remarks(record, theme),
            Section::Signature => signature(theme),
        };
        node = node.child(rendered);
    }
    node
}

fn terms_page(theme: &Theme) -> MarkupNode {
    let heading = text(TERMS_TITLE, theme.heading_size + 2.0).styled(|s| {
        s.font_weight = Some(FontWeight::Bold);
        s.text_align = Some(TextAlign::Center);
        s.margin_bottom = Some(theme.gap);
    });

    let clauses = ORDER_TERMS.iter().map(|(title, body)| {
        MarkupNode::view()
            .styled(|s| s.gap = Some(1.0))
            .child(text(*title, theme.terms_size).styled(|s| s.font_weight = Some(FontWeight::Bold)))
            .child(text(*body, theme.terms_size).styled(|s| s.line_height = Some(1.5)))
    });

    page(theme, id_of(TERMS_SELECTOR))
        .styled(|s| s.gap = Some(theme.gap * 0.6))
        .child(heading)
        .children(clauses)
}

// ============================================================================
// SECTIONS
// ============================================================================

fn header(record: &DocumentRecord, profile: &KindProfile, theme: &Theme) -> MarkupNode {
    let title = text(profile.label, theme.title_size).styled(|s| {
        s.font_weight = Some(FontWeight::Bold);
        s.text_align = Some(TextAlign::Center);
        s.color = Some(ACCENT);
        s.border_bottom = Some(BorderSide { width: theme.rule * 3.0, color: ACCENT });
        s.padding_bottom = Some(theme.cell_padding);
    });

    let meta = MarkupNode::view()
        .styled(|s| s.width = Some(Dimension::Percent(40.0)))
        .child(right_text(&format!("No. {}", record.document_number), theme.body_size))
        .child(right_text(
            &format!("発行日 {}", format::date(&record.document_date)),
            theme.body_size,
        ));

    let recipient = MarkupNode::view()
        .styled(|s| s.flex = Some(1.0))
        .child(
            text(&format!("{} 様", record.recipient_info.name), theme.heading_size + 3.0).styled(|s| {
                s.font_weight = Some(FontWeight::Bold);
                s.border_bottom = Some(theme.rule());
            }),
        )
        .child(text(profile.lead, theme.small_size).styled(|s| s.margin_top = Some(theme.cell_padding)));

    let total = MarkupNode::row_view()
        .styled(|s| {
            s.width = Some(Dimension::Percent(55.0));
            s.padding = Some(theme.cell_padding * 2.0);
            s.border_width = Some(theme.rule * 2.0);
            s.border_color = Some(ACCENT);
            s.cross_align = Some(CrossAlign::Center);
            s.main_align = Some(MainAlign::SpaceBetween);
        })
        .child(bold_text(profile.total_caption, theme.heading_size).styled(|s| {
            s.width = Some(Dimension::Percent(40.0));
        }))
        .child(
            right_text(
                &format::currency(record.fee_breakdown.sales_breakdown.total_payment.value()),
                theme.heading_size + 4.0,
            )
            .styled(|s| {
                s.flex = Some(1.0);
                s.font_weight = Some(FontWeight::Bold);
            }),
        );

    MarkupNode::view()
        .styled(|s| s.gap = Some(theme.gap))
        .child(title)
        .child(
            MarkupNode::row_view()
                .styled(|s| {
                    s.gap = Some(theme.gap);
                    s.cross_align = Some(CrossAlign::Start);
                })
                .child(recipient)
                .child(meta),
        )
        .child(total)
}

fn parties(record: &DocumentRecord, theme: &Theme) -> MarkupNode {
    let recipient = &record.recipient_info;
    let issuer = &record.issuer_info;

    let left = MarkupNode::view()
        .styled(|s| s.flex = Some(1.0))
        .child(small_heading("ご購入者", theme))
        .child(text(&format!("住所 {}", recipient.address), theme.body_size))
        .child(text(&format!("TEL {}", recipient.phone), theme.body_size));

    let mut right = MarkupNode::view().styled(|s| s.flex = Some(1.0));
    if let Some(logo) = issuer.logo.as_deref().filter(|l| !l.is_empty()) {
        right = right.child(MarkupNode::image(logo).styled(|s| {
            s.width = Some(Dimension::Pt(theme.logo_height * 3.0));
            s.height = Some(Dimension::Pt(theme.logo_height));
            s.object_fit = Some(ObjectFit::Contain);
        }));
    }
    right = right
        .child(bold_text(&issuer.name, theme.body_size + 1.5))
        .child(text(&issuer.address, theme.body_size))
        .child(text(&format!("TEL {}", issuer.phone), theme.body_size))
        .child(text(&issuer.email, theme.body_size))
        .child(text(&format!("担当 {}", issuer.representative), theme.body_size));

    MarkupNode::row_view()
        .styled(|s| {
            s.gap = Some(theme.gap * 2.0);
            s.cross_align = Some(CrossAlign::Start);
        })
        .child(left)
        .child(right)
}

fn vehicle(record: &DocumentRecord, theme: &Theme) -> MarkupNode {
    let v = &record.subject_vehicle;
    let pairs = [
        ("メーカー", v.maker.clone()),
        ("車名", v.model_name.clone()),
        ("グレード", v.grade.clone()),
        ("型式", v.model_code.clone()),
        ("年式", v.year.clone()),
        ("走行距離", format::quantity(v.mileage.value(), "km")),
        ("車体色", v.color.clone()),
        ("排気量", format::quantity(v.displacement.value(), "cc")),
        ("ミッション", v.transmission.clone()),
        ("修復歴", if v.accident_history { "有" } else { "無" }.to_string()),
        ("車検満了日", format::date(&v.inspection_expiry)),
        ("車両本体価格", format::currency(v.unit_price.value())),
    ];
    section("販売車両", kv_table(&pairs, theme), theme)
}

/// Trade-in details; an absent trade-in keeps every row with blank values.
fn trade_in(trade_in: Option<&TradeInVehicle>, theme: &Theme) -> MarkupNode {
    let pairs = match trade_in {
        Some(t) => [
            ("車名", t.name.clone()),
            ("登録番号", t.registration_number.clone()),
            ("走行距離", format::quantity(t.mileage.value(), "km")),
            ("初度登録", format::date(&t.first_registration)),
            ("車検満了日", format::date(&t.inspection_expiry)),
            ("車台番号", t.chassis_number.clone()),
            ("車体色", t.color.clone()),
            ("査定額", format::currency(t.appraised_price.value())),
        ],
        None => [
            ("車名", String::new()),
            ("登録番号", String::new()),
            ("走行距離", String::new()),
            ("初度登録", String::new()),
            ("車検満了日", String::new()),
            ("車台番号", String::new()),
            ("車体色", String::new()),
            ("査定額", String::new()),
        ],
    };
    section("下取車", kv_table(&pairs, theme), theme).with_id("trade-in")
}

fn accessories(record: &DocumentRecord, theme: &Theme) -> MarkupNode {
    let items = &record.line_item_accessories;

    let mut table = table(&[Dimension::Percent(70.0), Dimension::Percent(30.0)])
        .child(row(vec![label_cell("品名", theme), label_cell("金額", theme)]));

    for item in items {
        table = table.child(row(vec![
            value_cell(&item.name, TextAlign::Left, theme),
            value_cell(&format::currency(item.price.value()), TextAlign::Right, theme),
        ]));
    }
    for _ in items.len()..ACCESSORY_MIN_ROWS {
        table = table.child(row(vec![
            value_cell("", TextAlign::Left, theme),
            value_cell("", TextAlign::Right, theme),
        ]));
    }

    let total: Amount = items.iter().map(|i| i.price).sum();
    table = table.child(row(vec![
        label_cell("付属品合計", theme),
        bold_value_cell(&format::currency(total.value()), theme),
    ]));

    section("付属品", table, theme).with_id("accessories")
}

fn fees(record: &DocumentRecord, theme: &Theme) -> MarkupNode {
    let fees = &record.fee_breakdown;
    let groups = [
        ("税金・保険料", fees.tax_insurance.rows().to_vec()),
        ("預り法定費用", fees.legal_fees.rows().to_vec()),
        ("手続代行費用", fees.processing_fees.rows().to_vec()),
    ];

    let columns = groups.into_iter().map(|(title, rows)| {
        let total: Amount = rows.iter().map(|(_, a)| *a).sum();
        let mut table = table(&[Dimension::Percent(62.0), Dimension::Percent(38.0)]);
        for (label, amount) in &rows {
            table = table.child(amount_row(label, *amount, theme));
        }
        // Groups have different row counts; pad so the subtotals line up
        for _ in rows.len()..4 {
            table = table.child(row(vec![
                value_cell("", TextAlign::Left, theme),
                value_cell("", TextAlign::Right, theme),
            ]));
        }
        table = table.child(row(vec![
            label_cell("合計", theme),
            bold_value_cell(&format::currency(total.value()), theme),
        ]));

        MarkupNode::view()
            .styled(|s| {
                s.flex = Some(1.0);
                s.gap = Some(theme.cell_padding);
            })
            .child(small_heading(title, theme))
            .child(table)
    });

    section(
        "諸費用",
        MarkupNode::row_view()
            .styled(|s| {
                s.gap = Some(theme.gap);
                s.cross_align = Some(CrossAlign::Start);
            })
            .children(columns),
        theme,
    )
}

fn summary(record: &DocumentRecord, theme: &Theme) -> MarkupNode {
    let rows = record.fee_breakdown.sales_breakdown.rows();
    let last = rows.len() - 1;

    let mut table = table(&[Dimension::Percent(60.0), Dimension::Percent(40.0)]);
    for (i, (label, amount)) in rows.iter().enumerate() {
        table = if i == last {
            table.child(row(vec![
                label_cell(label, theme),
                bold_value_cell(&format::currency(amount.value()), theme),
            ]))
        } else {
            table.child(amount_row(label, *amount, theme))
        };
    }

    section("販売価格内訳", table, theme)
}

/// Installment plan; an absent plan keeps every row with blank values.
///
/// Bonus months and amount are printed as given, even when they disagree.
fn loan(loan: Option<&LoanTerms>, theme: &Theme) -> MarkupNode {
    let pairs = match loan {
        Some(l) => [
            ("頭金", format::currency(l.down_payment.value())),
            ("分割支払金", format::currency(l.principal.value())),
            ("分割手数料", format::currency(l.finance_charge.value())),
            ("分割支払総額", format::currency(l.total_payable.value())),
            ("支払回数", format::quantity(l.installment_count.value(), "回")),
            ("支払期間", format::quantity(l.term_months.value(), "ヶ月")),
            ("初回支払額", format::currency(l.first_installment.value())),
            ("2回目以降", format::currency(l.subsequent_installment.value())),
            ("ボーナス月", format::months(&l.bonus_months)),
            ("ボーナス加算額", format::currency(l.bonus_amount.value())),
        ],
        None => [
            ("頭金", String::new()),
            ("分割支払金", String::new()),
            ("分割手数料", String::new()),
            ("分割支払総額", String::new()),
            ("支払回数", String::new()),
            ("支払期間", String::new()),
            ("初回支払額", String::new()),
            ("2回目以降", String::new()),
            ("ボーナス月", String::new()),
            ("ボーナス加算額", String::new()),
        ],
    };
    section("お支払方法（クレジット）", kv_table(&pairs, theme), theme).with_id("loan")
}

fn bank_account(record: &DocumentRecord, theme: &Theme) -> MarkupNode {
    let account = record.issuer_info.bank_account.clone().unwrap_or_default();
    let pairs = [
        ("金融機関", account.bank_name),
        ("支店", account.branch),
        ("口座種別", account.account_type),
        ("口座番号", account.account_number),
        ("口座名義", account.account_holder),
        ("", String::new()),
    ];
    section("お振込先", kv_table(&pairs, theme), theme)
}

fn remarks(record: &DocumentRecord, theme: &Theme) -> MarkupNode {
    let boxed = MarkupNode::view()
        .styled(|s| {
            s.min_height = Some(Dimension::Pt(theme.remarks_height));
            s.padding = Some(theme.cell_padding);
            s.border_width = Some(theme.rule);
            s.border_color = Some(RULE_COLOR);
        })
        .child(text(&record.remarks, theme.body_size));
    section("備考", boxed, theme)
}

fn signature(theme: &Theme) -> MarkupNode {
    let seal_box = |caption: &str| {
        MarkupNode::view()
            .styled(|s| {
                s.flex = Some(1.0);
                s.height = Some(Dimension::Pt(theme.seal_height));
                s.padding = Some(theme.cell_padding);
                s.border_width = Some(theme.rule);
                s.border_color = Some(RULE_COLOR);
            })
            .child(text(caption, theme.small_size))
    };

    MarkupNode::row_view()
        .with_id("signature")
        .styled(|s| s.gap = Some(theme.gap))
        .child(seal_box("ご注文者 署名・捺印"))
        .child(seal_box("販売店 承認印"))
        .child(seal_box("担当者印"))
}

// ============================================================================
// BUILDING BLOCKS
// ============================================================================

fn section(title: &str, content: MarkupNode, theme: &Theme) -> MarkupNode {
    MarkupNode::view()
        .styled(|s| s.gap = Some(theme.cell_padding))
        .child(bold_text(title, theme.heading_size).styled(|s| {
            s.color = Some(ACCENT);
            s.border_bottom = Some(BorderSide { width: theme.rule * 2.0, color: ACCENT });
        }))
        .child(content)
}

fn small_heading(title: &str, theme: &Theme) -> MarkupNode {
    bold_text(title, theme.body_size).styled(|s| s.color = Some(ACCENT))
}

fn text(content: &str, size: f32) -> MarkupNode {
    MarkupNode::text(content).styled(|s| s.font_size = Some(size))
}

fn bold_text(content: &str, size: f32) -> MarkupNode {
    text(content, size).styled(|s| s.font_weight = Some(FontWeight::Bold))
}

fn right_text(content: &str, size: f32) -> MarkupNode {
    text(content, size).styled(|s| s.text_align = Some(TextAlign::Right))
}

fn table(column_widths: &[Dimension]) -> MarkupNode {
    let mut node = MarkupNode::new(NodeType::Table);
    node.column_widths = Some(column_widths.to_vec());
    node
}

fn row(cells: Vec<MarkupNode>) -> MarkupNode {
    MarkupNode::new(NodeType::Row).children(cells)
}

fn cell(theme: &Theme) -> MarkupNode {
    MarkupNode::new(NodeType::Cell).styled(|s| {
        s.padding = Some(theme.cell_padding);
        s.border_width = Some(theme.rule);
        s.border_color = Some(RULE_COLOR);
    })
}

fn label_cell(label: &str, theme: &Theme) -> MarkupNode {
    cell(theme)
        .styled(|s| s.background_color = Some(LABEL_BG))
        .child(text(label, theme.small_size))
}

fn value_cell(value: &str, align: TextAlign, theme: &Theme) -> MarkupNode {
    cell(theme).child(text(value, theme.body_size).styled(|s| s.text_align = Some(align)))
}

fn bold_value_cell(value: &str, theme: &Theme) -> MarkupNode {
    cell(theme).child(bold_text(value, theme.body_size).styled(|s| s.text_align = Some(TextAlign::Right)))
}

fn amount_row(label: &str, amount: Amount, theme: &Theme) -> MarkupNode {
    row(vec![
        label_cell(label, theme),
        value_cell(&format::currency(amount.value()), TextAlign::Right, theme),
    ])
}

/// Four-column label/value table, two pairs per row.
fn kv_table(pairs: &[(&str, String)], theme: &Theme) -> MarkupNode {
    let mut node = table(&[
        Dimension::Percent(17.0),
        Dimension::Percent(33.0),
        Dimension::Percent(17.0),
        Dimension::Percent(33.0),
    ]);
    for chunk in pairs.chunks(2) {
        let mut cells = Vec::with_capacity(4);
        for (label, value) in chunk {
            cells.push(label_cell(label, theme));
            cells.push(value_cell(value, TextAlign::Left, theme));
        }
        node = node.child(row(cells));
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::DocumentKind;
    use crate::record::{Accessory, BankAccount, TradeInVehicle};

    fn sample(kind: DocumentKind) -> DocumentRecord {
        let mut record = DocumentRecord::empty(kind);
        record.document_number = "EST-0001".into();
        record.document_date = "2024-04-01".into();
        record.recipient_info.name = "山田 太郎".into();
        record.issuer_info.name = "サンプル自動車販売".into();
        record.subject_vehicle.maker = "トヨタ".into();
        record.subject_vehicle.mileage = Amount::from(12345);
        record.subject_vehicle.unit_price = Amount::from(1_980_000);
        record.line_item_accessories = vec![Accessory { name: "フロアマット".into(), price: Amount::from(22000) }];
        record.fee_breakdown.sales_breakdown.total_payment = Amount::from(2_150_000);
        record
    }

    fn texts(node: &MarkupNode, out: &mut Vec<String>) {
        if let Some(t) = &node.text {
            out.push(t.clone());
        }
        for c in &node.children {
            texts(c, out);
        }
    }

    fn all_text(node: &MarkupNode) -> Vec<String> {
        let mut out = Vec::new();
        texts(node, &mut out);
        out
    }

    #[test]
    fn test_render_is_deterministic() {
        for kind in DocumentKind::ALL {
            let record = sample(kind);
            for mode in [RenderMode::Screen, RenderMode::Print] {
                assert_eq!(render(&record, mode), render(&record, mode));
            }
        }
    }

    #[test]
    fn test_render_round_trips_through_markup() {
        let record = sample(DocumentKind::Order);
        let markup = render(&record, RenderMode::Print);
        let parsed = MarkupNode::parse(&markup).unwrap();
        assert_eq!(parsed, build_document(&record, RenderMode::Print));
    }

    #[test]
    fn test_headings_follow_kind() {
        for (kind, label) in [
            (DocumentKind::Quote, "見積書"),
            (DocumentKind::Invoice, "請求書"),
            (DocumentKind::Order, "注文書"),
        ] {
            let doc = build_document(&sample(kind), RenderMode::Print);
            assert_eq!(all_text(&doc)[0], label);
        }
    }

    #[test]
    fn test_amounts_and_dates_are_formatted() {
        let doc = build_document(&sample(DocumentKind::Quote), RenderMode::Print);
        let text = all_text(&doc);
        assert!(text.contains(&"1,980,000円".to_string()));
        assert!(text.contains(&"2,150,000円".to_string()));
        assert!(text.contains(&"12,345km".to_string()));
        assert!(text.contains(&"発行日 2024/04/01".to_string()));
        assert!(text.contains(&"山田 太郎 様".to_string()));
    }

    #[test]
    fn test_non_finite_amounts_render_as_zero() {
        let record: DocumentRecord = serde_json::from_str(
            r#"{
                "documentKind": "quote",
                "subjectVehicle": { "unitPrice": "NaN", "mileage": null },
                "lineItemAccessories": [{ "name": "ETC", "price": "oops" }],
                "feeBreakdown": { "salesBreakdown": { "totalPayment": "Infinity" } }
            }"#,
        )
        .unwrap();

        for mode in [RenderMode::Screen, RenderMode::Print] {
            let markup = render(&record, mode);
            assert!(!markup.contains("NaN"));
            assert!(!markup.contains("undefined"));
            assert!(markup.contains("0円"));
        }
    }

    #[test]
    fn test_absent_trade_in_keeps_placeholder_rows() {
        let mut with = sample(DocumentKind::Order);
        with.trade_in_vehicle = Some(TradeInVehicle { name: "プリウス".into(), ..Default::default() });
        let without = sample(DocumentKind::Order);

        let a = build_document(&with, RenderMode::Print);
        let b = build_document(&without, RenderMode::Print);
        let ta = a.find_by_id("trade-in").unwrap();
        let tb = b.find_by_id("trade-in").unwrap();

        let table_a = &ta.children[1];
        let table_b = &tb.children[1];
        assert_eq!(table_b.node_type, NodeType::Table);
        assert_eq!(table_a.children.len(), table_b.children.len());
        assert_eq!(table_b.children.len(), 4);
        // labels present, values blank
        assert!(all_text(tb).contains(&"登録番号".to_string()));
        assert!(!all_text(tb).contains(&"プリウス".to_string()));
        assert!(all_text(ta).contains(&"プリウス".to_string()));
    }

    #[test]
    fn test_absent_loan_keeps_placeholder_rows() {
        let doc = build_document(&sample(DocumentKind::Quote), RenderMode::Print);
        let loan = doc.find_by_id("loan").unwrap();
        assert_eq!(loan.children[1].children.len(), 5);
        assert!(!all_text(loan).iter().any(|t| t.ends_with('円')));
    }

    #[test]
    fn test_bonus_months_with_zero_amount_render_permissively() {
        let mut record = sample(DocumentKind::Order);
        record.loan_terms = Some(LoanTerms { bonus_months: vec![7, 12], ..Default::default() });
        let doc = build_document(&record, RenderMode::Print);
        let text = all_text(doc.find_by_id("loan").unwrap());
        assert!(text.contains(&"7月・12月".to_string()));
        let idx = text.iter().position(|t| t == "ボーナス加算額").unwrap();
        assert_eq!(text[idx + 1], "0円");
    }

    #[test]
    fn test_accessory_table_pads_rows() {
        let doc = build_document(&sample(DocumentKind::Quote), RenderMode::Print);
        let table = &doc.find_by_id("accessories").unwrap().children[1];
        // header + min rows + total
        assert_eq!(table.children.len(), 1 + ACCESSORY_MIN_ROWS + 1);

        let mut many = sample(DocumentKind::Quote);
        many.line_item_accessories = (0..8)
            .map(|i| Accessory { name: format!("item {}", i), price: Amount::from(1000) })
            .collect();
        let doc = build_document(&many, RenderMode::Print);
        let table = &doc.find_by_id("accessories").unwrap().children[1];
        assert_eq!(table.children.len(), 1 + 8 + 1);
        assert!(all_text(table).contains(&"8,000円".to_string()));
    }

    #[test]
    fn test_terms_only_for_orders() {
        let order = build_document(&sample(DocumentKind::Order), RenderMode::Print);
        let terms = order.find_by_id("order-terms").unwrap();
        assert_eq!(all_text(terms)[0], TERMS_TITLE);
        assert!(order.find_by_id("signature").is_some());

        for kind in [DocumentKind::Quote, DocumentKind::Invoice] {
            let doc = build_document(&sample(kind), RenderMode::Print);
            assert!(doc.find_by_id("order-terms").is_none());
            assert!(doc.find_by_id("document-body").is_some());
        }
    }

    #[test]
    fn test_print_mode_is_fixed_a4() {
        let doc = build_document(&sample(DocumentKind::Invoice), RenderMode::Print);
        let body = doc.find_by_id("document-body").unwrap();
        assert_eq!(body.style.width, Some(Dimension::Pt(A4_WIDTH_PT)));
        assert_eq!(body.style.min_height, Some(Dimension::Pt(A4_HEIGHT_PT)));

        let screen = build_document(&sample(DocumentKind::Invoice), RenderMode::Screen);
        let body = screen.find_by_id("document-body").unwrap();
        assert_eq!(body.style.width, Some(Dimension::Percent(100.0)));
        assert_eq!(body.style.min_height, None);
    }

    #[test]
    fn test_invoice_shows_bank_account() {
        let mut record = sample(DocumentKind::Invoice);
        record.issuer_info.bank_account = Some(BankAccount {
            bank_name: "みらい銀行".into(),
            account_number: "1234567".into(),
            ..Default::default()
        });
        let text = all_text(&build_document(&record, RenderMode::Print));
        assert!(text.contains(&"みらい銀行".to_string()));
        assert!(text.contains(&"1234567".to_string()));
    }

    #[test]
    fn test_logo_only_when_present() {
        let mut record = sample(DocumentKind::Quote);
        let doc = build_document(&record, RenderMode::Print);
        assert!(doc.image_sources().is_empty());

        record.issuer_info.logo = Some("data:image/png;base64,AAAA".into());
        let doc = build_document(&record, RenderMode::Print);
        assert_eq!(doc.image_sources(), vec!["data:image/png;base64,AAAA".to_string()]);
    }
}
