use harvest_core::{classify_page_type, prioritize_urls, url_pattern, PageType};
use pretty_assertions::assert_eq;

const BASE: &str = "https://web.archive.org/web/20200601/https://candidate.com";

fn classify_path(path: &str) -> PageType {
    classify_page_type(&format!("{BASE}/{path}"))
}

#[test]
fn root_index_and_home_are_homepage() {
    for url in [
        "https://web.archive.org/web/20200601/https://example.com/",
        "https://web.archive.org/web/20200601/https://example.com",
        "https://web.archive.org/web/20200601/http://www.example.com/home",
        "https://web.archive.org/web/20200601/http://example.com/index.html",
        "https://web.archive.org/web/20200601/http://example.com/index.php",
    ] {
        assert_eq!(classify_page_type(url), PageType::Homepage, "{url}");
    }
}

#[test]
fn keyword_tables_cover_each_type() {
    let cases: &[(&[&str], PageType)] = &[
        (
            &[
                "issues",
                "issue",
                "the-issues",
                "on-the-issues",
                "platform",
                "priorities",
                "agenda",
                "positions",
                "plan",
                "legislation",
                "proven-leader",
                "issues/healthcare",
            ],
            PageType::Issues,
        ),
        (
            &[
                "about",
                "bio",
                "biography",
                "story",
                "our-story",
                "background",
                "meet-ted",
                "meet-jane-doe",
                "meet_the_candidate",
            ],
            PageType::Biography,
        ),
        (
            &[
                "news",
                "press",
                "press-releases",
                "press-release",
                "newsroom",
                "media",
                "media-center",
                "blog",
                "category",
                "articles",
                "updates",
                "in-the-news",
            ],
            PageType::News,
        ),
        (
            &["endorsements", "supporters", "campaign-supporters", "endorsement"],
            PageType::Endorsements,
        ),
        (
            &[
                "constituentservices",
                "services",
                "district",
                "offices",
                "casework",
                "resources",
                "help",
            ],
            PageType::ConstituentServices,
        ),
        (
            &[
                "donate",
                "contribute",
                "volunteer",
                "get-involved",
                "take-action",
                "join",
                "support",
                "events",
                "event",
                "calendar",
            ],
            PageType::Action,
        ),
        (
            &[
                "privacy-policy",
                "photos",
                "gallery",
                "sitemap",
                "terms",
                "wp-content",
                "feed",
                "some-random-page",
            ],
            PageType::Other,
        ),
    ];

    for (paths, expected) in cases {
        for path in *paths {
            assert_eq!(classify_path(path), *expected, "/{path}");
        }
    }
}

#[test]
fn query_fragment_case_and_modifiers_are_ignored() {
    assert_eq!(classify_path("issues?topic=healthcare"), PageType::Issues);
    assert_eq!(classify_path("about#section2"), PageType::Biography);
    assert_eq!(classify_path("Issues"), PageType::Issues);
    assert_eq!(classify_path("ABOUT"), PageType::Biography);
    assert_eq!(
        classify_page_type("https://web.archive.org/web/20200601120000id_/https://candidate.com/issues"),
        PageType::Issues
    );
    assert_eq!(
        classify_page_type("https://candidate.com/donate"),
        PageType::Action
    );
}

#[test]
fn cms_router_segments_are_skipped() {
    let wb = "https://web.archive.org/web/20180601";
    let cases = [
        ("https://corker.senate.gov/public/index.cfm/press-releases", PageType::News),
        ("https://corker.senate.gov/public/index.cfm/biography", PageType::Biography),
        (
            "https://corker.senate.gov/public/index.cfm/issues-and-legislation",
            PageType::Issues,
        ),
        (
            "https://senator.senate.gov/public/index.cfm/services",
            PageType::ConstituentServices,
        ),
        ("https://site.com/index.php/about", PageType::Biography),
        ("https://site.com/index.php/news", PageType::News),
        ("https://site.com/pages/donate", PageType::Action),
        ("https://site.com/pages/issues", PageType::Issues),
        ("https://corker.senate.gov/public/index.cfm/", PageType::Homepage),
        ("https://site.com/public/", PageType::Homepage),
        ("https://site.com/index.php", PageType::Homepage),
        ("https://site.com/pressreleases", PageType::News),
        ("https://site.com/press-room", PageType::News),
    ];

    for (original, expected) in cases {
        assert_eq!(
            classify_page_type(&format!("{wb}/{original}")),
            expected,
            "{original}"
        );
    }
}

#[test]
fn prioritize_orders_by_type_and_is_stable() {
    let urls: Vec<String> = [
        "donate",
        "privacy-policy",
        "issues",
        "news",
        "about",
        "endorsements",
        "district",
    ]
    .iter()
    .map(|p| format!("{BASE}/{p}"))
    .collect();

    let types: Vec<PageType> = prioritize_urls(urls)
        .iter()
        .map(|u| classify_page_type(u))
        .collect();
    assert_eq!(
        types,
        vec![
            PageType::Issues,
            PageType::Biography,
            PageType::News,
            PageType::Endorsements,
            PageType::ConstituentServices,
            PageType::Action,
            PageType::Other,
        ]
    );

    let home_last = vec![format!("{BASE}/donate"), format!("{BASE}/")];
    assert_eq!(prioritize_urls(home_last)[0], format!("{BASE}/"));

    let same_tier: Vec<String> = ["press", "blog", "media-center"]
        .iter()
        .map(|p| format!("{BASE}/{p}"))
        .collect();
    assert_eq!(prioritize_urls(same_tier.clone()), same_tier);

    assert!(prioritize_urls(Vec::new()).is_empty());
}

#[test]
fn labels_round_trip_through_strings() {
    for page_type in PageType::ALL {
        assert_eq!(page_type.to_string().parse::<PageType>(), Ok(page_type));
    }
    assert!("sidebar".parse::<PageType>().is_err());
}

#[test]
fn url_pattern_drops_scheme_and_trailing_slash() {
    assert_eq!(url_pattern("https://site.com/about/"), "site.com/about");
    assert_eq!(url_pattern("http://site.com/about"), "site.com/about");
}
