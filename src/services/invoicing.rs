//! PDF invoice rendering.
//!
//! Layout mirrors the bill the round's customers already know: title,
//! billing period, customer block, a line-item table (date, quantity,
//! litres, rate, amount), totals and a payable line, and a footer. A4
//! portrait, built-in Helvetica, no external assets.

use chrono::Local;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use rust_decimal::Decimal;

use crate::entities::{customer, milk_entry};
use crate::errors::ServiceError;
use crate::money;
use crate::services::billing::{BillPeriod, BillTotals};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 14.0;
const LINE_HEIGHT_MM: f32 = 6.0;

// Table column x positions (mm from the left edge).
const COL_DATE: f32 = MARGIN_MM;
const COL_QUANTITY: f32 = 58.0;
const COL_LITRES: f32 = 96.0;
const COL_RATE: f32 = 130.0;
const COL_AMOUNT: f32 = 164.0;

pub struct InvoiceService {
    price_per_litre: Decimal,
}

struct PageCursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageCursor {
    fn new(title: &str) -> Self {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        Self {
            doc,
            layer,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn text(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn advance(&mut self, lines: f32) {
        self.y -= LINE_HEIGHT_MM * lines;
    }

    /// Starts a fresh page when fewer than `needed` lines fit.
    fn ensure_space(&mut self, needed: f32) {
        if self.y - LINE_HEIGHT_MM * needed < MARGIN_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }
}

impl InvoiceService {
    pub fn new(price_per_litre: Decimal) -> Self {
        Self { price_per_litre }
    }

    /// Renders the invoice to PDF bytes.
    ///
    /// `entries` must already be the active set (period-filtered when a
    /// period is given), oldest first; `totals` must come from
    /// `billing::compute_bill` over the same set.
    pub fn render(
        &self,
        customer: &customer::Model,
        entries: &[milk_entry::Model],
        totals: &BillTotals,
        period: Option<BillPeriod>,
    ) -> Result<Vec<u8>, ServiceError> {
        let mut page = PageCursor::new("Milk Billing Invoice");
        let regular = page
            .doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ServiceError::ExternalServiceError(format!("PDF font: {e}")))?;
        let bold = page
            .doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ServiceError::ExternalServiceError(format!("PDF font: {e}")))?;

        // Title and period
        page.text("Milk Billing Invoice", 20.0, MARGIN_MM, &bold);
        page.advance(2.0);
        let period_text = match period {
            Some(p) => format!("Billing Period: {}", p.label()),
            None => "Billing Period: All Records".to_string(),
        };
        page.text(&period_text, 10.0, MARGIN_MM, &regular);
        page.advance(1.0);
        page.text(
            &format!("Generated on: {}", Local::now().format("%d-%m-%Y %H:%M")),
            10.0,
            MARGIN_MM,
            &regular,
        );
        page.advance(2.0);

        // Customer block
        page.text("Customer Details", 12.0, MARGIN_MM, &bold);
        page.advance(1.2);
        page.text(&format!("Name: {}", customer.name), 10.0, MARGIN_MM, &regular);
        page.advance(1.0);
        page.text(
            &format!("Current Balance: {:.2}", customer.balance_amount),
            10.0,
            MARGIN_MM,
            &regular,
        );
        page.advance(2.0);

        // Line-item table
        page.text("Milk Entries", 12.0, MARGIN_MM, &bold);
        page.advance(1.2);
        self.table_header(&mut page, &bold);

        if entries.is_empty() {
            page.text("No entries for this period.", 10.0, MARGIN_MM, &regular);
            page.advance(1.0);
        }
        for entry in entries {
            page.ensure_space(1.0);
            page.text(
                &entry.date.format("%d-%m-%Y").to_string(),
                10.0,
                COL_DATE,
                &regular,
            );
            page.text(&entry.quantity_ml.to_string(), 10.0, COL_QUANTITY, &regular);
            page.text(
                &format!("{:.3}", money::round_litres_fine(entry.litres())),
                10.0,
                COL_LITRES,
                &regular,
            );
            page.text(
                &format!("{:.2}", money::round_money(self.price_per_litre)),
                10.0,
                COL_RATE,
                &regular,
            );
            page.text(
                &format!("{:.2}", money::round_money(entry.amount(self.price_per_litre))),
                10.0,
                COL_AMOUNT,
                &regular,
            );
            page.advance(1.0);
        }

        // Totals
        page.ensure_space(5.0);
        page.advance(0.5);
        page.text("Total", 10.0, COL_DATE, &bold);
        page.text(&totals.total_ml.to_string(), 10.0, COL_QUANTITY, &bold);
        page.text(&format!("{:.2}", totals.total_litres), 10.0, COL_LITRES, &bold);
        page.text(&format!("{:.2}", totals.total_amount), 10.0, COL_AMOUNT, &bold);
        page.advance(1.5);
        if period.is_some() {
            page.text(
                &format!("Previous Balance: {:.2}", totals.previous_balance),
                10.0,
                MARGIN_MM,
                &regular,
            );
            page.advance(1.0);
        }
        page.text(
            &format!("Total Payable: {:.2}", totals.total_payable),
            12.0,
            MARGIN_MM,
            &bold,
        );
        page.advance(2.0);

        // Footer
        page.ensure_space(1.0);
        page.text(
            "Thank you for your business. Please settle the payable amount at delivery.",
            8.0,
            MARGIN_MM,
            &regular,
        );

        page.doc
            .save_to_bytes()
            .map_err(|e| ServiceError::ExternalServiceError(format!("PDF generation: {e}")))
    }

    fn table_header(&self, page: &mut PageCursor, bold: &IndirectFontRef) {
        page.text("Date", 10.0, COL_DATE, bold);
        page.text("Quantity (ml)", 10.0, COL_QUANTITY, bold);
        page.text("Litres", 10.0, COL_LITRES, bold);
        page.text("Rate", 10.0, COL_RATE, bold);
        page.text("Amount", 10.0, COL_AMOUNT, bold);
        page.advance(1.2);
    }

    /// Attachment file name, matching the period of the rendered bill.
    pub fn file_name(customer: &customer::Model, period: Option<BillPeriod>) -> String {
        let safe_name: String = customer
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        match period {
            Some(p) => format!("bill_{safe_name}_{}_{:02}.pdf", p.year, p.month),
            None => format!("bill_{safe_name}_all.pdf"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::billing::compute_bill;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn test_customer() -> customer::Model {
        let now = Utc::now();
        customer::Model {
            id: 1,
            name: "Amit Kumar".into(),
            name_lower: "amit kumar".into(),
            phone: None,
            whatsapp_number: None,
            balance_amount: dec!(150.00),
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(date: &str, quantity_ml: i64) -> milk_entry::Model {
        let now = Utc::now();
        milk_entry::Model {
            id: 0,
            customer_id: 1,
            date: date.parse().unwrap(),
            quantity_ml,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let customer = test_customer();
        let entries = vec![entry("2024-01-05", 1000), entry("2024-01-20", 2000)];
        let totals = compute_bill(&customer, &entries, dec!(50));
        let svc = InvoiceService::new(dec!(50));
        let bytes = svc
            .render(&customer, &entries, &totals, Some(BillPeriod { year: 2024, month: 1 }))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn renders_with_no_entries() {
        let customer = test_customer();
        let totals = compute_bill(&customer, &[], dec!(50));
        let svc = InvoiceService::new(dec!(50));
        let bytes = svc.render(&customer, &[], &totals, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn paginates_long_entry_lists() {
        let customer = test_customer();
        let entries: Vec<_> = (1..=120)
            .map(|i| entry(&format!("2024-01-{:02}", (i % 28) + 1), 500))
            .collect();
        let totals = compute_bill(&customer, &entries, dec!(50));
        let svc = InvoiceService::new(dec!(50));
        let bytes = svc.render(&customer, &entries, &totals, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn file_names_are_filesystem_safe() {
        let mut customer = test_customer();
        customer.name = "Ram / Shyam".into();
        assert_eq!(
            InvoiceService::file_name(&customer, Some(BillPeriod { year: 2024, month: 3 })),
            "bill_Ram___Shyam_2024_03.pdf"
        );
        assert_eq!(
            InvoiceService::file_name(&customer, None),
            "bill_Ram___Shyam_all.pdf"
        );
    }
}
