#[cfg(test)]
mod tests {
    use crate::models::{TaxFigures, TaxRecord, record_columns};
    use crate::presentation::{AttachmentKind, export_csv, record_panels};

    fn record(id: i64, file: Option<(&str, &str)>) -> TaxRecord {
        TaxRecord {
            id,
            firm_name: Some("Acme".to_string()),
            date_period: Some("2024".to_string()),
            figures: TaxFigures {
                net_profit: 1000.0,
                bribes: 12.5,
                ..TaxFigures::default()
            },
            file: file.map(|(key, _)| key.to_string()),
            file_name: file.map(|(_, name)| name.to_string()),
            user_id: 1,
        }
    }

    #[test]
    fn test_attachment_kind_follows_extension() {
        assert_eq!(AttachmentKind::for_name("scan.png"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::for_name("scan.JPG"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::for_name("scan.jpeg"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::for_name("anim.gif"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::for_name("report.pdf"), AttachmentKind::Pdf);
        assert_eq!(AttachmentKind::for_name("ledger.xlsx"), AttachmentKind::Link);
        assert_eq!(AttachmentKind::for_name("README"), AttachmentKind::Link);
    }

    #[test]
    fn test_record_columns_layout() {
        let columns = record_columns();

        assert_eq!(columns.len(), 34);
        assert_eq!(&columns[..3], &["id", "FirmName", "Date_Period"]);
        assert_eq!(columns[3], "net_profit");
        assert_eq!(&columns[32..], &["file", "user_id"]);
    }

    #[test]
    fn test_panels_are_numbered_from_one() {
        let panels = record_panels(&[record(5, None), record(9, None)]);

        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].number, 1);
        assert_eq!(panels[0].dom_id, "record0");
        assert_eq!(panels[1].number, 2);
        assert_eq!(panels[1].dom_id, "record1");
    }

    #[test]
    fn test_panel_without_document_skips_file_field() {
        let panels = record_panels(&[record(1, None)]);
        let fields = &panels[0].fields;

        assert_eq!(fields.len(), 33);
        assert!(fields.iter().all(|f| f.label != "file"));

        let net_profit = fields.iter().find(|f| f.label == "net_profit").unwrap();
        assert_eq!(net_profit.value, "1000.0");
    }

    #[test]
    fn test_panel_with_document_links_upload() {
        let panels = record_panels(&[record(1, Some(("f00d.pdf", "report.pdf")))]);
        let file = panels[0]
            .fields
            .iter()
            .find(|f| f.label == "file")
            .expect("file field rendered");

        assert_eq!(file.value, "report.pdf");

        let attachment = file.attachment.as_ref().unwrap();
        assert_eq!(attachment.kind, AttachmentKind::Pdf);
        assert_eq!(attachment.url, "/uploads/f00d.pdf");
        assert_eq!(attachment.name, "report.pdf");
    }

    #[test]
    fn test_export_csv_header_and_rows() {
        let csv = export_csv(&[record(1, None), record(2, Some(("k.png", "a.png")))]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], record_columns().join(","));
        assert!(lines[1].starts_with("1,Acme,2024,1000.0,0.0,0.0,12.5,"));
        assert!(lines[1].ends_with(",,1"));
        assert!(lines[2].ends_with(",a.png,1"));
        assert!(!csv.contains("k.png"));
    }

    #[test]
    fn test_export_csv_quotes_text_with_commas() {
        let mut quoted = record(1, None);
        quoted.firm_name = Some("Acme, Ltd".to_string());

        let csv = export_csv(&[quoted]).unwrap();
        assert!(csv.contains("1,\"Acme, Ltd\",2024,"));
    }

    #[test]
    fn test_export_csv_empty_has_header_only() {
        let csv = export_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
