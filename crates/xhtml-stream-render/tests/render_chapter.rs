use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use xhtml_stream::{
    HandlerContext, HandlerRegistry, HandlerResult, OutputUnit, ParagraphHandler, Tag, TagHandler,
};
use xhtml_stream_render::{
    DrawCommand, PageAnnotationKind, RenderDocument, RenderEngine, RenderEngineError,
    RenderEngineOptions, ResolvedTextStyle, TextMeasurer, COMMIT_OUT_OF_PAGE,
};

const CHAPTER_LINKS: &str = include_str!("../../../tests/xhtml/chapter_links.xhtml");

struct MonoMeasurer;

impl TextMeasurer for MonoMeasurer {
    fn measure_text_px(&self, text: &str, style: &ResolvedTextStyle) -> f32 {
        text.chars().count() as f32 * style.size_px * 0.5
    }
}

struct CountingParagraph {
    opened: Arc<AtomicUsize>,
}

impl TagHandler for CountingParagraph {
    fn on_start(&self, ctx: &HandlerContext<'_>, tag: &mut Tag) -> HandlerResult {
        self.opened.fetch_add(1, Ordering::SeqCst);
        ParagraphHandler.on_start(ctx, tag)
    }

    fn on_content(&self, ctx: &HandlerContext<'_>, tag: &Tag, text: &str) -> HandlerResult {
        ParagraphHandler.on_content(ctx, tag, text)
    }

    fn on_end(
        &self,
        ctx: &HandlerContext<'_>,
        tag: &Tag,
        accumulated: Vec<OutputUnit>,
    ) -> HandlerResult {
        ParagraphHandler.on_end(ctx, tag, accumulated)
    }

    fn owns_stack(&self) -> bool {
        true
    }
}

fn short_page_options() -> RenderEngineOptions {
    let mut opts = RenderEngineOptions::for_display(480, 100);
    opts.page.margin_top = 0;
    opts.page.margin_bottom = 0;
    opts.page.paragraph_gap_px = 0;
    opts
}

fn render(opts: RenderEngineOptions) -> RenderDocument {
    let mut engine = RenderEngine::new(opts);
    engine.set_text_measurer(Arc::new(MonoMeasurer));
    engine.render_xhtml(CHAPTER_LINKS).expect("chapter should render")
}

#[test]
fn every_local_goto_resolves_to_a_destination() {
    let doc = render(RenderEngineOptions::default());
    assert!(doc.destination("chapter1").is_some());
    assert!(doc.destination("section2").is_some());
    assert!(doc.unresolved_gotos().is_empty());
}

#[test]
fn section_destination_precedes_its_paragraph_text() {
    let doc = render(RenderEngineOptions::default());
    let dest = doc.destination("section2").expect("section2 placed");
    let page = &doc.pages[dest.page_number - 1];
    let section_text = page
        .content_commands
        .iter()
        .find_map(|cmd| match cmd {
            DrawCommand::Text(text) if text.text.starts_with("Section two") => Some(text),
            _ => None,
        })
        .expect("section text on the destination page");
    assert!(dest.y < section_text.baseline_y);
}

#[test]
fn external_links_are_annotated_with_resolved_uris() {
    let doc = render(RenderEngineOptions::default().with_link_root("https://example.com"));
    let uris: Vec<&str> = doc
        .pages
        .iter()
        .flat_map(|page| page.annotations_of(&PageAnnotationKind::Uri))
        .filter_map(|a| a.value.as_deref())
        .collect();
    assert!(uris.contains(&"https://example.com/docs/page.html"));
    assert!(uris.contains(&"https://other.example/x"));
}

#[test]
fn small_pages_paginate_without_losing_destinations() {
    let doc = render(RenderEngineOptions::for_display(240, 160));
    assert!(doc.page_count() > 1);
    for (idx, page) in doc.pages.iter().enumerate() {
        assert_eq!(page.page_number, idx + 1);
    }
    let dest = doc.destination("section2").expect("section2 placed");
    assert!(dest.page_number <= doc.page_count());
}

#[test]
fn snapshot_round_trips_rendered_chapter() {
    let doc = render(RenderEngineOptions::default());
    let json = doc.to_json().expect("serialize");
    assert_eq!(RenderDocument::from_json(&json), Some(doc));
}

#[test]
fn marker_that_cannot_fit_fails_the_render() {
    // Content ends 2px above the page edge; a 5px marker there leaves the page.
    let engine = RenderEngine::new(short_page_options());
    let html = r#"<body><p style="margin-bottom: 76px">x</p><a name="late"></a></body>"#;
    let err = engine.render_xhtml(html).expect_err("marker overflows page");
    match err {
        RenderEngineError::Commit(err) => {
            assert_eq!(err.code, COMMIT_OUT_OF_PAGE);
            assert_eq!(err.page_number, Some(1));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn commit_failure_stops_conversion_of_remaining_markup() {
    let opened = Arc::new(AtomicUsize::new(0));
    let registry = HandlerRegistry::html_default().with_handler(
        "p",
        Arc::new(CountingParagraph {
            opened: Arc::clone(&opened),
        }),
    );
    let engine = RenderEngine::new(short_page_options()).with_registry(registry);
    let html = r#"<body><p style="margin-bottom: 76px">x</p><a name="late"></a><p>more</p><!-- open"#;
    let err = engine.render_xhtml(html).expect_err("marker overflows page");
    match err {
        RenderEngineError::Commit(err) => {
            assert_eq!(err.code, COMMIT_OUT_OF_PAGE);
            assert_eq!(err.page_number, Some(1));
        }
        other => panic!("commit error should win over later markup, got {:?}", other),
    }
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}
