use serde_json::json;

use crate::{
    database::{_tests::fixtures::blog_registry, CollectionProvider, Config, SchemaRegistry},
    dbx::{Dialect, Params, SelectQuery},
    resolver::{RecordFieldResolver, RequestInfo},
    search::{ExprGroup, FilterError, SearchFilter, SearchProvider, SignOp, Token},
};

fn id(name: &str) -> Token {
    Token::identifier(name)
}

fn compile(registry: &SchemaRegistry, base: &str, config: &Config, groups: Vec<ExprGroup>) -> (String, Params) {
    let base = registry.find_collection_by_name_or_id(base).unwrap();
    let mut resolver = RecordFieldResolver::new(registry, base, None, config);
    let expr = SearchFilter::new(groups).build_expr(&mut resolver).unwrap();
    let mut params = Params::new();
    let sql = expr.build(config.dialect, &mut params);
    (sql, params)
}

#[test]
fn and_siblings_on_one_multi_relation_share_an_exists() {
    let registry = blog_registry();
    let (sql, params) = compile(
        &registry,
        "posts",
        &Config::default(),
        vec![
            ExprGroup::and(id("categories.name"), SignOp::Eq, Token::text("a")),
            ExprGroup::and(id("categories.name"), SignOp::Neq, Token::text("b")),
        ],
    );

    assert!(sql.starts_with("EXISTS (SELECT 1 FROM `posts` `__mm_posts` LEFT JOIN "), "{sql}");
    assert!(
        sql.ends_with(
            "WHERE `__mm_posts`.`id` = `posts`.`id` \
             AND (__mm_posts_categories.name = :f0) AND (__mm_posts_categories.name != :f1))"
        ),
        "{sql}"
    );
    assert_eq!(sql.matches("EXISTS").count(), 1);
    assert_eq!(params.get("f0"), Some(&json!("a")));
    assert_eq!(params.get("f1"), Some(&json!("b")));
}

#[test]
fn lone_multi_relation_condition_stays_plain() {
    let registry = blog_registry();
    let (sql, _) = compile(
        &registry,
        "posts",
        &Config::default(),
        vec![
            ExprGroup::and(id("categories.name"), SignOp::Eq, Token::text("a")),
            ExprGroup::and(id("title"), SignOp::Eq, Token::text("x")),
        ],
    );
    assert_eq!(sql, "(posts_categories.name = :f0) AND (posts.title = :f1)");
}

#[test]
fn or_and_any_match_operators_are_never_grouped() {
    let registry = blog_registry();
    let (sql, _) = compile(
        &registry,
        "posts",
        &Config::default(),
        vec![
            ExprGroup::and(id("categories.name"), SignOp::Eq, Token::text("a")),
            ExprGroup::or(id("categories.name"), SignOp::Eq, Token::text("b")),
        ],
    );
    assert_eq!(sql, "(posts_categories.name = :f0) OR (posts_categories.name = :f1)");

    let (sql, _) = compile(
        &registry,
        "posts",
        &Config::default(),
        vec![
            ExprGroup::and(id("categories.name"), SignOp::AnyEq, Token::text("a")),
            ExprGroup::and(id("categories.name"), SignOp::AnyLike, Token::text("b")),
        ],
    );
    assert_eq!(sql, "(posts_categories.name = :f0) AND (posts_categories.name LIKE :f1)");
}

#[test]
fn different_chains_get_separate_treatment() {
    let registry = blog_registry();
    let (sql, _) = compile(
        &registry,
        "posts",
        &Config::sqlite(),
        vec![
            ExprGroup::and(id("categories.name"), SignOp::Eq, Token::text("a")),
            ExprGroup::and(id("tags:each"), SignOp::Eq, Token::text("b")),
            ExprGroup::and(id("categories.name"), SignOp::Eq, Token::text("c")),
        ],
    );

    // categories conditions grouped at the position of the first one, tags left alone
    assert!(sql.starts_with("(EXISTS (SELECT 1 FROM \"posts\" AS \"__mm_posts\""), "{sql}");
    assert!(sql.contains("AND (__mm_posts_categories.name = :f0) AND (__mm_posts_categories.name = :f2))"), "{sql}");
    assert!(sql.ends_with(") AND (posts_tags_je.value = :f1)"), "{sql}");
}

#[test]
fn email_guard_wraps_the_comparison() {
    let registry = blog_registry();
    let (sql, _) = compile(
        &registry,
        "comments",
        &Config::default(),
        vec![ExprGroup::and(id("author.email"), SignOp::Eq, Token::text("a@b.c"))],
    );
    assert_eq!(
        sql,
        "((comments_author.email = :f0) AND (comments_author.emailVisibility = TRUE))"
    );

    let (sql, _) = compile(
        &registry,
        "comments",
        &Config::default().with_hidden_fields(true),
        vec![ExprGroup::and(id("author.email"), SignOp::Eq, Token::text("a@b.c"))],
    );
    assert_eq!(sql, "comments_author.email = :f0");
}

#[test]
fn request_fields_compare_against_bound_values() {
    let registry = blog_registry();
    let base = registry.find_collection_by_name_or_id("posts").unwrap();
    let info = RequestInfo::new("GET");
    let mut resolver = RecordFieldResolver::new(&registry, base, Some(&info), &Config::default());

    let expr = SearchFilter::new(vec![ExprGroup::and(id("@request.method"), SignOp::Eq, Token::text("GET"))])
        .build_expr(&mut resolver)
        .unwrap();
    let mut params = Params::new();
    assert_eq!(expr.build(Dialect::MySql, &mut params), ":t0 = :f1");
    assert_eq!(params.get("t0"), Some(&json!("GET")));
}

#[test]
fn request_data_each_siblings_share_an_exists() {
    let registry = blog_registry();
    let base = registry.find_collection_by_name_or_id("posts").unwrap();
    let mut data = serde_json::Map::new();
    data.insert("tags".into(), json!(["a", "b"]));
    let info = RequestInfo::new("POST").with_data(data);
    let mut resolver = RecordFieldResolver::new(&registry, base, Some(&info), &Config::default());

    let expr = SearchFilter::new(vec![
        ExprGroup::and(id("@request.data.tags:each"), SignOp::Eq, Token::text("a")),
        ExprGroup::and(id("@request.data.tags:each"), SignOp::Eq, Token::text("b")),
    ])
    .build_expr(&mut resolver)
    .unwrap();
    let mut params = Params::new();
    let sql = expr.build(Dialect::MySql, &mut params);

    assert!(sql.starts_with("EXISTS (SELECT 1 FROM `posts` `__mm_posts` LEFT JOIN JSON_TABLE(:mmdataEach0,"), "{sql}");
    assert!(
        sql.ends_with("AND (__mm__dataEach_tags_je.value = :f1) AND (__mm__dataEach_tags_je.value = :f3))"),
        "{sql}"
    );
    assert_eq!(sql.matches("EXISTS").count(), 1);
    assert_eq!(params.get("mmdataEach0"), Some(&json!("[\"a\",\"b\"]")));
}

#[test]
fn unknown_fields_fail_the_filter() {
    let registry = blog_registry();
    let base = registry.find_collection_by_name_or_id("posts").unwrap();
    let mut resolver = RecordFieldResolver::new(&registry, base, None, &Config::default());

    let err = SearchFilter::new(vec![ExprGroup::and(id("nope"), SignOp::Eq, Token::text("x"))])
        .build_expr(&mut resolver)
        .unwrap_err();
    assert!(matches!(err, FilterError::Resolution(e) if e.path == "nope"));
}

#[test]
fn provider_applies_resolver_joins_to_both_queries() {
    let registry = blog_registry();
    let config = Config::default();
    let base = registry.find_collection_by_name_or_id("comments").unwrap();
    let mut resolver = RecordFieldResolver::new(&registry, base, None, &config);

    let mut query = SelectQuery::new(Dialect::MySql);
    query.select(["comments.*"]).from(["comments"]);

    let queries = SearchProvider::new(&mut resolver, &config, query)
        .add_filter(vec![ExprGroup::and(id("post.title"), SignOp::Like, Token::text("rust"))])
        .parse_sort("-created,@random")
        .per_page(20)
        .build()
        .unwrap();

    assert_eq!(
        queries.models.sql,
        "SELECT DISTINCT `comments`.* FROM `comments` \
         LEFT JOIN `posts` `comments_post` ON comments_post.id = comments.post \
         WHERE comments_post.title LIKE :f0 \
         ORDER BY `comments`.`created` DESC, RAND() LIMIT 20"
    );
    assert_eq!(queries.models.params.get("f0"), Some(&json!("%rust%")));

    let count = queries.count.unwrap();
    assert_eq!(
        count.sql,
        "SELECT COUNT(DISTINCT `comments`.`id`) AS `count` FROM `comments` \
         LEFT JOIN `posts` `comments_post` ON comments_post.id = comments.post \
         WHERE comments_post.title LIKE :f0"
    );
}
