use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagepilot::renderer::{CssParser, SelectorList};
use pagepilot::{ConfigPatch, Optimizer, Page, PageEvent};

fn sample_css(rules: usize) -> String {
    let mut css = String::from("@font-face { font-family: Body; src: url(/f.woff2); }\n");
    for i in 0..rules {
        css.push_str(&format!(
            ".card-{i} > .title, #item-{i} a[href^=\"/\"] {{ color: red; margin: {i}px !important; }}\n"
        ));
    }
    css
}

fn sample_page(blocks: usize) -> String {
    let mut html = format!("<html><head><style>{}</style></head><body>", sample_css(50));
    for i in 0..blocks {
        html.push_str(&format!(
            "<div id=\"item-{i}\" class=\"card-{i}\" style=\"height: 120px\"><p class=\"title\">Item</p><a href=\"/p/{i}\">Read</a><img data-src=\"/img/{i}.jpg\"></div>"
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Stylesheet and selector parsing
fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    let css = sample_css(200);
    let parser = CssParser::new();

    group.bench_function("css_rules", |b| b.iter(|| black_box(parser.parse(black_box(&css)))));

    group.bench_function("selector_list", |b| {
        b.iter(|| {
            black_box(SelectorList::parse(black_box(
                "main > article:nth-child(2n+1) .title, a[href$=\".pdf\" i]:not(.external)",
            )))
        })
    });

    group.finish();
}

/// Optimizer passes over a generated page
fn benchmark_optimizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer");
    let html = sample_page(200);

    group.bench_function("init_and_load", |b| {
        b.iter(|| {
            let page = Page::load("https://example.com/", &html).unwrap();
            let mut optimizer = Optimizer::new(page, ConfigPatch::new());
            optimizer.init(None);
            optimizer.dispatch(PageEvent::Load);
            black_box(optimizer.get_metrics())
        })
    });

    let page = Page::load("https://example.com/", &html).unwrap();
    let optimizer = Optimizer::new(page, ConfigPatch::new());
    group.bench_function("critical_css", |b| {
        b.iter(|| black_box(optimizer.generate_critical_css()))
    });

    group.finish();
}

criterion_group!(benches, benchmark_parsing, benchmark_optimizer);
criterion_main!(benches);
