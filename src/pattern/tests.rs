use super::*;
use smallvec::smallvec;
use std::sync::Arc;

fn params(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
    PathPattern::compile(pattern)
        .unwrap()
        .matches(path)
        .map(|p| p.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_root_path() {
    let p = PathPattern::compile("/").unwrap();
    assert!(p.is_match("/"));
    assert!(!p.is_match("/a"));
    assert!(!p.is_match(""));
}

#[test]
fn test_literal_matches_only_itself() {
    let p = PathPattern::compile("/zoo/animals").unwrap();
    assert!(p.is_match("/zoo/animals"));
    assert!(!p.is_match("/zoo/animals/"));
    assert!(!p.is_match("/zoo"));
    assert!(!p.is_match("/zoo/animals/1"));
    assert!(!p.is_match("/Zoo/animals"));
}

#[test]
fn test_variable_extraction() {
    assert_eq!(params("/a/{x}/c", "/a/B/c"), Some(pairs(&[("x", "B")])));
    assert_eq!(params("/a/{x}/c", "/a/B/d"), None);
}

#[test]
fn test_empty_segment_does_not_bind_variable() {
    assert_eq!(params("/users/{id}", "/users/"), None);
    assert_eq!(params("/a/{x}/c", "/a//c"), None);
    assert_eq!(params("/a/*", "/a/"), None);
    assert_eq!(params("/a/*/c", "/a//c"), None);
    assert_eq!(params("/js/*-*.js", "/js/-v2.js"), None);
    // a regex that admits the empty string still binds it
    assert_eq!(params("/a/{x:[a-z]*}/c", "/a//c"), Some(pairs(&[("x", "")])));
}

#[test]
fn test_expand_rejects_empty_plain_variable() {
    let p = PathPattern::compile("/users/{id}").unwrap();
    assert!(matches!(
        p.expand(&[("id", "")]),
        Err(PatternError::InvalidValue { .. })
    ));
    assert_eq!(p.expand(&[("id", "7")]).unwrap(), "/users/7");
}

#[test]
fn test_variables_keep_declaration_order() {
    assert_eq!(
        params("/users/{user_id}/posts/{post_id}", "/users/7/posts/9"),
        Some(pairs(&[("user_id", "7"), ("post_id", "9")]))
    );
}

#[test]
fn test_regex_variable() {
    let p = PathPattern::compile("/items/{id:[0-9]{2,3}}").unwrap();
    assert!(p.is_match("/items/12"));
    assert!(p.is_match("/items/123"));
    assert!(!p.is_match("/items/1"));
    assert!(!p.is_match("/items/12a"));
}

#[test]
fn test_slash_inside_braces_does_not_split() {
    let p = PathPattern::compile("/f/{name:[a-z/]+}/x").unwrap();
    assert_eq!(p.segments().len(), 3);
}

#[test]
fn test_wildcard_matches_one_segment() {
    let p = PathPattern::compile("/a/*/c").unwrap();
    assert!(p.is_match("/a/anything/c"));
    assert!(!p.is_match("/a/b/b/c"));
    assert_eq!(p.matches("/a/x/c").unwrap().len(), 0);
}

#[test]
fn test_glob_star_matches_zero_or_more() {
    let p = PathPattern::compile("/static/**").unwrap();
    assert!(p.is_match("/static"));
    assert!(p.is_match("/static/"));
    assert!(p.is_match("/static/css/site.css"));
    assert!(!p.is_match("/other/site.css"));
}

#[test]
fn test_star_declaration_matches_everything() {
    let p = PathPattern::compile("*").unwrap();
    for path in ["/", "/a", "/a/b/c", "//x"] {
        assert!(p.is_match(path), "{path}");
    }
    assert_eq!(p.segments(), PathPattern::compile("/**").unwrap().segments());
}

#[test]
fn test_catch_all_captures_remaining() {
    assert_eq!(
        params("/files/*path", "/files/a/b/c.txt"),
        Some(pairs(&[("path", "a/b/c.txt")]))
    );
    assert_eq!(params("/files/*path", "/files"), Some(pairs(&[("path", "")])));
}

#[test]
fn test_composite_positional_groups() {
    assert_eq!(
        params("/js/*-*.js", "/js/app-v2.js"),
        Some(pairs(&[("0", "app"), ("1", "v2")]))
    );
    assert_eq!(params("/js/*-*.js", "/js/app.js"), None);
}

#[test]
fn test_composite_named_groups() {
    assert_eq!(
        params("/docs/{name}.{ext:(md|txt)}", "/docs/readme.md"),
        Some(pairs(&[("name", "readme"), ("ext", "md")]))
    );
    assert_eq!(params("/docs/{name}.{ext:(md|txt)}", "/docs/readme.pdf"), None);
}

#[test]
fn test_double_slash_preserved_by_default() {
    let p = PathPattern::compile("//double//slash").unwrap();
    assert!(p.is_match("//double//slash"));
    assert!(!p.is_match("/double/slash"));
}

#[test]
fn test_double_slash_collapsed_when_normalized() {
    let p = PathPattern::compile_with("//double//slash", true).unwrap();
    assert!(p.is_normalized());
    assert!(p.is_match("/double/slash"));
    assert!(p.is_match("//double//slash/"));
    let root = PathPattern::compile_with("/", true).unwrap();
    assert!(root.is_match("/"));
    assert!(root.is_match("//"));
}

#[test]
fn test_specificity_ordering() {
    let score = |p: &str| PathPattern::compile(p).unwrap().specificity();
    assert!(score("/a/b") > score("/a/{x:[a-z]}"));
    assert!(score("/a/{x:[a-z]}") > score("/a/{x}"));
    assert!(score("/a/{x}") > score("/a/*"));
    assert!(score("/a/*") > score("/a/**"));
    assert!(score("/a/{x}") > score("/a/*rest"));
    assert_eq!(score("/a/{x}"), score("/a/{y}"));
}

#[test]
fn test_compile_is_idempotent() {
    for src in ["/a/{b}/c", "/x/{id:[0-9]+}", "/js/*-*.js", "/files/*rest", "/s/**"] {
        let first = PathPattern::compile(src).unwrap();
        let second = PathPattern::compile(src).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.specificity(), second.specificity());
    }
}

#[test]
fn test_compile_errors() {
    assert!(matches!(
        compile("/a/{id"),
        Err(PatternError::UnterminatedBrace { position: 3, .. })
    ));
    assert!(matches!(
        compile("/a/id}"),
        Err(PatternError::UnbalancedBrace { position: 5, .. })
    ));
    assert!(matches!(
        compile("/a/{id}/b/{id}"),
        Err(PatternError::DuplicateVariable { .. })
    ));
    assert!(matches!(
        compile("/a/**/b"),
        Err(PatternError::NonTerminalGlob { .. })
    ));
    assert!(matches!(
        compile("/a/*rest/b"),
        Err(PatternError::NonTerminalGlob { .. })
    ));
    assert!(matches!(
        compile("/a/{}"),
        Err(PatternError::InvalidVariableName { .. })
    ));
    assert!(matches!(
        compile("/a/{id:[}"),
        Err(PatternError::InvalidRegex { .. })
    ));
}

#[test]
fn test_variable_names() {
    let p = PathPattern::compile("/{a}/x/*-*.js/{b:\\d+}").unwrap();
    assert_eq!(p.variable_names(), vec!["a", "0", "1", "b"]);
}

#[test]
fn test_expand() {
    let p = PathPattern::compile("/users/{id:[0-9]+}/files/*path").unwrap();
    assert_eq!(
        p.expand(&[("id", "42"), ("path", "a/b.txt")]).unwrap(),
        "/users/42/files/a/b.txt"
    );
    assert!(matches!(
        p.expand(&[("id", "x"), ("path", "a")]),
        Err(PatternError::InvalidValue { .. })
    ));
    assert!(matches!(
        p.expand(&[("id", "1")]),
        Err(PatternError::MissingVariable { .. })
    ));
    let wild = PathPattern::compile("/a/*").unwrap();
    assert!(matches!(
        wild.expand(&[]),
        Err(PatternError::NotExpandable { .. })
    ));
    assert_eq!(PathPattern::compile("/").unwrap().expand(&[]).unwrap(), "/");
    assert_eq!(
        PathPattern::compile("/static/**").unwrap().expand(&[]).unwrap(),
        "/static"
    );
}

#[test]
fn test_expand_composite() {
    let p = PathPattern::compile("/docs/{name}.{ext}").unwrap();
    assert_eq!(
        p.expand(&[("name", "guide"), ("ext", "md")]).unwrap(),
        "/docs/guide.md"
    );
}

#[test]
fn test_join_declarations() {
    assert_eq!(join_declarations("/api", "/users"), "/api/users");
    assert_eq!(join_declarations("/api/", "/users"), "/api/users");
    assert_eq!(join_declarations("/api", "/"), "/api");
    assert_eq!(join_declarations("/api", "*"), "/api/**");
    assert_eq!(join_declarations("api", "users"), "/api/users");
    assert_eq!(join_declarations("/", "/users"), "/users");
    assert_eq!(join_declarations("", "*"), "*");
}

#[test]
fn test_substitute_positional() {
    let captured: ParamVec = smallvec![
        (Arc::from("0"), "app".to_string()),
        (Arc::from("1"), "v2".to_string()),
    ];
    assert_eq!(
        substitute("/static/{1}/{0}.js", &captured),
        "/static/v2/app.js"
    );
    assert_eq!(substitute("/x/{missing}/{0", &captured), "/x/{missing}/{0");
}
