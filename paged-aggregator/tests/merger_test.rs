mod common;

use chrono::{DateTime, TimeZone, Utc};
use common::{badges, init_tracing, issuer, Badge};
use paged_aggregator::{
    merge, Cursor, FilterState, InterleavePolicy, MappedSource, MergeSource, MockPageSource, MultiSourceItem,
    MultiSourceMerger, Page, PagedCollectionAggregator, Result, SourceSnapshot,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Post {
    slug: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
enum WritingFeed {
    Badge { id: u32 },
    Post { slug: String },
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
}

fn post(slug: &str, d: u32) -> Post {
    Post {
        slug: slug.to_string(),
        published_at: day(d),
    }
}

fn snapshot(source_id: &str, len: usize, has_more: bool) -> SourceSnapshot<String> {
    SourceSnapshot {
        source_id: source_id.to_string(),
        items: (0..len)
            .map(|i| MultiSourceItem {
                source_id: source_id.to_string(),
                sort_key: None,
                payload: format!("{source_id}{i}"),
            })
            .collect(),
        is_loading: false,
        has_more,
    }
}

fn badge_source(filters: &FilterState) -> MockPageSource<Badge> {
    MockPageSource::new("badges")
        .with_page(filters, None, Page::new(badges("gitpoap", 0..3), None))
}

fn post_source(filters: &FilterState) -> MockPageSource<Post> {
    MockPageSource::new("posts")
        .with_page(
            filters,
            None,
            Page::new(vec![post("launch", 10), post("retro", 4)], Some(Cursor::from("posts_2"))),
        )
        .with_page(filters, Some("posts_2"), Page::new(vec![post("intro", 1)], None))
}

fn writing_feed(
    badges: Arc<PagedCollectionAggregator<MockPageSource<Badge>>>,
    posts: Arc<PagedCollectionAggregator<MockPageSource<Post>>>,
) -> (MappedSource<MockPageSource<Badge>, WritingFeed>, MappedSource<MockPageSource<Post>, WritingFeed>) {
    let badges = MappedSource::new("badges", badges, |badge: &Badge| WritingFeed::Badge { id: badge.id })
        .with_sort_key(|badge: &Badge| Some(day(badge.id + 2)));
    let posts = MappedSource::new("posts", posts, |post: &Post| WritingFeed::Post {
        slug: post.slug.clone(),
    })
    .with_sort_key(|post: &Post| Some(post.published_at));
    (badges, posts)
}

#[test]
fn test_merge_groups_by_source_and_composes_flags() {
    let view = merge(
        vec![snapshot("a", 3, false), snapshot("b", 2, true)],
        InterleavePolicy::SourcePriority,
    );

    assert!(!view.is_loading);
    assert!(view.has_more);
    assert_eq!(view.len(), 5);
    let sources: Vec<&str> = view.items.iter().map(|item| item.source_id.as_str()).collect();
    assert_eq!(sources, vec!["a", "a", "a", "b", "b"]);
}

#[test]
fn test_merge_is_loading_when_any_source_is() {
    let mut loading = snapshot("b", 0, false);
    loading.is_loading = true;

    let view = merge(vec![snapshot("a", 2, false), loading], InterleavePolicy::default());
    assert!(view.is_loading);
    assert!(!view.has_more);
    assert_eq!(view.len(), 2);
}

#[test]
fn test_sort_key_policy_is_stable_and_puts_keyless_items_last() {
    let keyed = |source_id: &str, payload: &str, sort_key: Option<DateTime<Utc>>| MultiSourceItem {
        source_id: source_id.to_string(),
        sort_key,
        payload: payload.to_string(),
    };
    let a = SourceSnapshot {
        source_id: "a".to_string(),
        items: vec![keyed("a", "a-old", Some(day(1))), keyed("a", "a-none", None), keyed("a", "a-tie", Some(day(5)))],
        is_loading: false,
        has_more: false,
    };
    let b = SourceSnapshot {
        source_id: "b".to_string(),
        items: vec![keyed("b", "b-new", Some(day(9))), keyed("b", "b-tie", Some(day(5)))],
        is_loading: false,
        has_more: false,
    };

    let view = merge(vec![a, b], InterleavePolicy::SortKeyDescending);
    let order: Vec<&str> = view.payloads().map(String::as_str).collect();
    assert_eq!(order, vec!["b-new", "a-tie", "b-tie", "a-old", "a-none"]);
}

#[tokio::test]
async fn test_writing_feed_merges_heterogeneous_sources() -> Result<()> {
    init_tracing();

    let filters = issuer("gitpoap");
    let badges = Arc::new(PagedCollectionAggregator::new(Arc::new(badge_source(&filters))));
    let posts = Arc::new(PagedCollectionAggregator::new(Arc::new(post_source(&filters))));
    let (badge_feed, post_feed) = writing_feed(badges, posts);

    let mut merger: MultiSourceMerger<WritingFeed> = MultiSourceMerger::new();
    merger.add_source(Box::new(badge_feed));
    merger.add_source(Box::new(post_feed));
    assert_eq!(merger.source_ids(), vec!["badges".to_string(), "posts".to_string()]);

    for (source_id, result) in merger.apply_filters(&filters).await {
        assert!(result?.is_applied(), "{source_id} should load its first page");
    }

    let view = merger.merged().await;
    assert!(!view.is_loading);
    assert!(view.has_more, "posts still has a second page");
    assert_eq!(
        view.payloads().cloned().collect::<Vec<_>>(),
        vec![
            WritingFeed::Badge { id: 0 },
            WritingFeed::Badge { id: 1 },
            WritingFeed::Badge { id: 2 },
            WritingFeed::Post { slug: "launch".to_string() },
            WritingFeed::Post { slug: "retro".to_string() },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_sort_key_policy_interleaves_sources() -> Result<()> {
    init_tracing();

    let filters = issuer("gitpoap");
    let badges = Arc::new(PagedCollectionAggregator::new(Arc::new(badge_source(&filters))));
    let posts = Arc::new(PagedCollectionAggregator::new(Arc::new(post_source(&filters))));
    let (badge_feed, post_feed) = writing_feed(badges, posts);

    let mut merger: MultiSourceMerger<WritingFeed> = MultiSourceMerger::new().with_policy(InterleavePolicy::SortKeyDescending);
    merger.add_source(Box::new(badge_feed));
    merger.add_source(Box::new(post_feed));
    merger.apply_filters(&filters).await;

    // badges sort on days 2..=4, posts on days 10 and 4
    let view = merger.merged().await;
    assert_eq!(
        view.payloads().cloned().collect::<Vec<_>>(),
        vec![
            WritingFeed::Post { slug: "launch".to_string() },
            WritingFeed::Badge { id: 2 },
            WritingFeed::Post { slug: "retro".to_string() },
            WritingFeed::Badge { id: 1 },
            WritingFeed::Badge { id: 0 },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_load_more_only_touches_sources_with_more() -> Result<()> {
    init_tracing();

    let filters = issuer("gitpoap");
    let badge_mock = Arc::new(badge_source(&filters));
    let post_mock = Arc::new(post_source(&filters));
    let badges = Arc::new(PagedCollectionAggregator::new(badge_mock.clone()));
    let posts = Arc::new(PagedCollectionAggregator::new(post_mock.clone()));
    let (badge_feed, post_feed) = writing_feed(badges, posts);

    let mut merger: MultiSourceMerger<WritingFeed> = MultiSourceMerger::new();
    merger.add_source(Box::new(badge_feed));
    merger.add_source(Box::new(post_feed));
    merger.apply_filters(&filters).await;

    let results = merger.load_more().await;
    assert_eq!(results.len(), 1);
    let (source_id, result) = results.into_iter().next().expect("one source loaded");
    assert_eq!(source_id, "posts");
    assert!(result?.is_applied());

    assert_eq!(badge_mock.calls(), 1);
    assert_eq!(post_mock.calls(), 2);

    let view = merger.merged().await;
    assert_eq!(view.len(), 6);
    assert!(!view.has_more);
    assert!(merger.load_more().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_merged_view_is_loading_while_one_source_loads() -> Result<()> {
    init_tracing();

    let filters = issuer("gitpoap");
    let post_mock = Arc::new(post_source(&filters));
    let gate = post_mock.gate(&filters, None);
    let badges = Arc::new(PagedCollectionAggregator::new(Arc::new(badge_source(&filters))));
    let posts = Arc::new(PagedCollectionAggregator::new(post_mock));
    let (badge_feed, post_feed) = writing_feed(badges.clone(), posts.clone());

    let mut merger: MultiSourceMerger<WritingFeed> = MultiSourceMerger::new();
    merger.add_source(Box::new(badge_feed));
    merger.add_source(Box::new(post_feed));

    badges.fetch_first_page(&filters).await?;
    let pending = tokio::spawn({
        let posts = posts.clone();
        let filters = filters.clone();
        async move { posts.fetch_first_page(&filters).await }
    });
    while !posts.status().await.is_loading {
        tokio::task::yield_now().await;
    }

    let view = merger.merged().await;
    assert!(view.is_loading);
    assert_eq!(view.len(), 3, "loaded badges stay visible");

    gate.notify_one();
    assert!(pending.await.expect("first-page task panicked")?.is_applied());

    let view = merger.merged().await;
    assert!(!view.is_loading);
    assert_eq!(view.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_source_snapshot_is_consistent_during_next_page() -> Result<()> {
    init_tracing();

    let filters = issuer("gitpoap");
    let post_mock = Arc::new(post_source(&filters));
    let gate = post_mock.gate(&filters, Some("posts_2"));
    let posts = Arc::new(PagedCollectionAggregator::new(post_mock));
    let feed = MappedSource::new("posts", posts.clone(), |post: &Post| post.slug.clone());

    assert!(feed.snapshot().await.items.is_empty(), "nothing is active yet");
    feed.apply_filters(&filters).await?;

    let pending = tokio::spawn({
        let posts = posts.clone();
        async move { posts.fetch_next_page().await }
    });
    while !posts.status().await.is_fetching_next {
        tokio::task::yield_now().await;
    }

    let during = feed.snapshot().await;
    assert!(during.is_loading);
    assert!(during.has_more);
    assert_eq!(during.items.len(), 2);

    gate.notify_one();
    assert!(pending.await.expect("next-page task panicked")?.is_applied());

    let after = feed.snapshot().await;
    assert!(!after.is_loading);
    assert!(!after.has_more);
    assert_eq!(after.items.len(), 3);
    Ok(())
}
