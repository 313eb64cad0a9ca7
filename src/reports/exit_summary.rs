use crate::errors::ServiceError;
use crate::services::settlement::SettlementQuote;
use crate::storage::sanitize_file_name;
use chrono::NaiveDate;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use rust_decimal::Decimal;
use std::io::BufWriter;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 20.0;
const RIGHT: f32 = 190.0;
const AMOUNT_X: f32 = 150.0;
const BOTTOM_MARGIN: f32 = 40.0;

/// `Asha Rao` becomes `Asha_Rao_ExitSummary.pdf`.
pub fn exit_summary_file_name(tenant_name: &str) -> String {
    format!("{}_ExitSummary.pdf", sanitize_file_name(tenant_name))
}

fn money(amount: Decimal) -> String {
    format!("Rs. {:.2}", amount.round_dp(2))
}

struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Canvas {
    fn new(title: &str) -> Result<Self, ServiceError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ServiceError::RenderError(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ServiceError::RenderError(e.to_string()))?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - 25.0,
        })
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT), Mm(self.y)), false),
                (Point::new(Mm(RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
        if self.y < BOTTOM_MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - 25.0;
        }
    }

    fn finish(self) -> Result<Vec<u8>, ServiceError> {
        let mut writer = BufWriter::new(Vec::<u8>::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| ServiceError::RenderError(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| ServiceError::RenderError(e.to_string()))
    }
}

/// Renders the tenant exit summary as a single A4 document (more pages
/// only when the deduction table overflows).
pub fn render_exit_summary(quote: &SettlementQuote, date: NaiveDate) -> Result<Vec<u8>, ServiceError> {
    let mut canvas = Canvas::new("Tenant Exit Summary")?;

    canvas.text("Tenant Exit Summary", 20.0, LEFT, true);
    canvas.advance(12.0);
    canvas.text(&format!("Date: {}", date.format("%d-%m-%Y")), 11.0, LEFT, false);
    canvas.advance(7.0);
    canvas.text(&format!("Tenant Name: {}", quote.tenant_name), 11.0, LEFT, false);
    canvas.advance(7.0);
    canvas.text(&format!("Flat ID: {}", quote.flat_id), 11.0, LEFT, false);
    canvas.advance(7.0);
    canvas.text(&format!("Deposit Amount: {}", money(quote.deposit)), 11.0, LEFT, false);
    canvas.advance(12.0);

    canvas.text("Deductions", 13.0, LEFT, true);
    canvas.advance(8.0);
    canvas.text("Reason", 11.0, LEFT, true);
    canvas.text("Amount", 11.0, AMOUNT_X, true);
    canvas.advance(2.5);
    canvas.rule();
    canvas.advance(6.0);

    if quote.deductions.is_empty() {
        canvas.text("No deductions", 11.0, LEFT, false);
        canvas.text(&money(Decimal::ZERO), 11.0, AMOUNT_X, false);
        canvas.advance(7.0);
    } else {
        for deduction in &quote.deductions {
            let reason = if deduction.reason.trim().is_empty() {
                "-"
            } else {
                deduction.reason.trim()
            };
            canvas.text(reason, 11.0, LEFT, false);
            canvas.text(&money(deduction.amount), 11.0, AMOUNT_X, false);
            canvas.advance(7.0);
        }
    }

    canvas.rule();
    canvas.advance(8.0);
    canvas.text(
        &format!("Total Deductions: {}", money(quote.total_deductions)),
        12.0,
        LEFT,
        true,
    );
    canvas.advance(8.0);
    canvas.text(&format!("Final Refund: {}", money(quote.refund)), 12.0, LEFT, true);
    canvas.advance(18.0);
    canvas.text("Thank you for staying with us!", 11.0, LEFT, false);
    canvas.advance(20.0);
    canvas.text("Authorized Signature: ____________________", 11.0, LEFT, false);

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::settlement::Deduction;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn quote(deductions: Vec<Deduction>) -> SettlementQuote {
        let total: Decimal = deductions.iter().map(|d| d.amount).sum();
        SettlementQuote {
            tenancy_id: Uuid::new_v4(),
            tenant_name: "Asha Rao".into(),
            flat_id: "sunshine-towers-101".into(),
            deposit: dec!(10000),
            total_deductions: total,
            refund: dec!(10000) - total,
            deductions,
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = render_exit_summary(
            &quote(vec![
                Deduction { reason: "Cleaning".into(), amount: dec!(500) },
                Deduction { reason: "Repaint".into(), amount: dec!(1500) },
            ]),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_without_deductions() {
        let bytes = render_exit_summary(&quote(vec![]), NaiveDate::from_ymd_opt(2025, 1, 31).unwrap())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_deduction_lists_spill_onto_new_pages() {
        let deductions = (0..80)
            .map(|i| Deduction { reason: format!("Item {}", i), amount: dec!(10) })
            .collect();
        let bytes = render_exit_summary(&quote(deductions), NaiveDate::from_ymd_opt(2025, 1, 31).unwrap())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn file_name_uses_tenant_name() {
        assert_eq!(exit_summary_file_name("Asha Rao"), "Asha_Rao_ExitSummary.pdf");
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(dec!(8000)), "Rs. 8000.00");
        assert_eq!(money(dec!(-250.5)), "Rs. -250.50");
    }
}
