//! End-to-end extraction over in-memory documents.
//!
//! Exercises text, table and metric extraction through the same
//! `PdfDocumentHandle` seam the pdfium engine implements.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use irpdf::content::memory::{MemoryDocument, MemoryPage};
use irpdf::content::{
    build_tables, cluster_rows, extract_text, table_from_words, PageSelector, TextOptions, Word,
};
use irpdf::metrics::{MetricExtractor, MetricPatterns, MetricRequest, GROSS_PROFIT_METRIC, NET_FEES_METRIC};
use irpdf::Basis;

fn report() -> MemoryDocument {
    MemoryDocument::from_texts([
        "Hays plc\nInterim results for the six months",
        "Germany net fees +2% (LFL) while France gross profit -5% reported\n\n\n\n\nOutlook",
        "Country   FY24   FY23\nGermany 42 15\nJapan 7 3\nSummary",
    ])
}

fn extractor() -> MetricExtractor {
    MetricExtractor::new(Arc::new(MetricPatterns::default_set().unwrap()))
}

fn pages_of(doc: &MemoryDocument) -> Vec<(u32, String)> {
    extract_text(
        doc,
        &PageSelector::All,
        TextOptions {
            dedupe_whitespace: false,
        },
    )
    .unwrap()
    .into_iter()
    .map(|b| (b.page, b.text))
    .collect()
}

// ─── Text ────────────────────────────────────────────────────────────────────

#[test]
fn text_blocks_ascend_one_per_valid_page() {
    let blocks = extract_text(
        &report(),
        &PageSelector::Pages(vec![3, 2, 3, 99]),
        TextOptions::default(),
    )
    .unwrap();
    let pages: Vec<u32> = blocks.iter().map(|b| b.page).collect();
    assert_eq!(pages, [2, 3]);
    assert!(blocks[0].text.ends_with("reported\n\nOutlook"));
    assert!(blocks[1].text.starts_with("Country FY24 FY23"));
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[test]
fn table_rows_keep_digits_and_multiword_lines() {
    let tables = build_tables(&report(), &PageSelector::Pages(vec![3])).unwrap();
    assert_eq!(tables.len(), 1);
    let rows = tables[0].rows();
    assert_eq!(
        rows,
        vec![
            vec!["Country", "FY24", "FY23"],
            vec!["Germany", "42", "15"],
            vec!["Japan", "7", "3"],
        ]
    );
}

#[test]
fn clustering_ignores_word_order() {
    let page = MemoryPage::from_text("Country FY24 FY23\nGermany 42 15\nJapan 7 3\nUK 1.5 -2");
    let expected = cluster_rows(&page.words);

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let mut words = page.words.clone();
        words.shuffle(&mut rng);
        assert_eq!(cluster_rows(&words), expected);
    }
}

#[test]
fn cells_are_contiguous_and_rejoin_to_rows() {
    let words = vec![
        Word::new("Region", 40.0, 80.0),
        Word::new("Net fees", 140.0, 80.3),
        Word::new("Germany", 40.0, 100.0),
        Word::new("+2%", 140.0, 99.6),
        Word::new("Asia Pacific", 40.0, 120.0),
        Word::new("-5%", 140.0, 120.0),
        Word::new("(LFL)", 200.0, 120.0),
    ];
    let table = table_from_words(4, &words).unwrap();
    let rows = cluster_rows(&words);

    for (row_idx, row_text) in rows.iter().enumerate() {
        let cells: Vec<_> = table.cells.iter().filter(|c| c.row == row_idx).collect();
        let cols: Vec<usize> = cells.iter().map(|c| c.col).collect();
        assert_eq!(cols, (0..cells.len()).collect::<Vec<_>>());

        let rejoined = cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        assert_eq!(&rejoined, row_text);
    }
    assert_eq!(table.col_count, 3);
    assert_eq!(table.title, "Detected table-like rows p.4");
}

#[test]
fn tables_serialize_with_row_and_column_counts() {
    let table = build_tables(&report(), &PageSelector::Pages(vec![3]))
        .unwrap()
        .remove(0);
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["n_rows"], 3);
    assert_eq!(json["n_cols"], 3);
    assert_eq!(json["cells"][0]["text"], "Country");
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

#[test]
fn metrics_from_document_pages() {
    let request = MetricRequest {
        company: "Hays plc".into(),
        period_label: "H1 FY25".into(),
        metrics: None,
        countries: Some(vec!["Germany".into(), "France".into(), "Japan".into()]),
    };
    let result = extractor().extract(&report(), &request).unwrap();

    assert_eq!(result.items.len(), 2);
    let germany = &result.items[0];
    assert_eq!(
        (germany.country.as_str(), germany.metric_name.as_str(), germany.basis, germany.page),
        ("Germany", NET_FEES_METRIC, Basis::LikeForLike, 2)
    );
    assert!((germany.value - 2.0).abs() < f64::EPSILON);

    let france = &result.items[1];
    assert_eq!(france.metric_name, GROSS_PROFIT_METRIC);
    assert_eq!(france.basis, Basis::Reported);
    assert!((france.value + 5.0).abs() < f64::EPSILON);

    // Japan appears only in a table row without a percentage.
    assert_eq!(result.not_disclosed, vec!["Japan"]);
    assert!(!result.recheck_performed);
}

#[test]
fn recheck_clears_countries_mentioned_anywhere() {
    let doc = report();
    let request = MetricRequest {
        company: "Hays plc".into(),
        period_label: String::new(),
        metrics: None,
        countries: Some(vec![
            "Japan".into(),
            "Chile".into(),
            "Mexico".into(),
            "Germany".into(),
        ]),
    };
    let result = extractor().extract_from_pages(&pages_of(&doc), &request);

    assert!(result.recheck_performed);
    assert_eq!(result.not_disclosed, vec!["Chile", "Mexico"]);
    assert!(result.items.iter().all(|i| i.country == "Germany"));
}

#[test]
fn metric_items_serialize_in_response_shape() {
    let pages = vec![(1, "UK net fees -3.5% like-for-like".to_string())];
    let result = extractor().extract_from_pages(
        &pages,
        &MetricRequest {
            company: "PageGroup".into(),
            period_label: "Q3 2024".into(),
            ..MetricRequest::default()
        },
    );
    let json = serde_json::to_value(&result.items[0]).unwrap();
    assert_eq!(json["country"], "United Kingdom");
    assert_eq!(json["metric"], NET_FEES_METRIC);
    assert_eq!(json["value"], -3.5);
    assert_eq!(json["unit"], "%");
    assert_eq!(json["basis"], "Like-for-like");
    assert_eq!(json["company"], "PageGroup");
    assert!(json["report_title"].is_null());
    assert!(json["table_title"].is_null());
    assert_eq!(json["footnote_refs"], serde_json::json!([]));
}
