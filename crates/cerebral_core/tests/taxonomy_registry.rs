use cerebral_core::taxonomy::registry::TaxonomyRegistry;
use cerebral_core::{NodeDepth, TaxonomyPath};

#[test]
fn builtin_tree_has_four_domains_in_display_order() {
    let registry = TaxonomyRegistry::builtin().unwrap();
    let keys = registry
        .domains()
        .iter()
        .map(|domain| domain.key.as_str())
        .collect::<Vec<_>>();
    assert_eq!(keys, ["intellectual", "emotional", "physical", "beyond"]);

    for domain in registry.domains() {
        assert_eq!(domain.depth, NodeDepth::Domain);
        assert!(domain.parent_key.is_none());
        assert!(
            (4..=8).contains(&domain.children.len()),
            "{} has {} categories",
            domain.key,
            domain.children.len()
        );
    }
}

#[test]
fn professional_category_nests_a_third_level() {
    let registry = TaxonomyRegistry::builtin().unwrap();
    let professional = TaxonomyPath::category("intellectual", "professional");

    assert!(!registry.is_leaf(&professional).unwrap());
    let children = registry.list_children(&professional).unwrap();
    let keys = children
        .iter()
        .map(|node| node.key.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        keys,
        ["articles", "projects", "skills", "tools", "contacts", "resources"]
    );

    let articles = registry
        .get_node(&TaxonomyPath::subcategory(
            "intellectual",
            "professional",
            "articles",
        ))
        .unwrap();
    assert_eq!(articles.depth, NodeDepth::Subcategory);
    assert_eq!(articles.parent_key.as_deref(), Some("professional"));
    assert!(articles.is_leaf());
}

#[test]
fn leaves_return_no_children() {
    let registry = TaxonomyRegistry::builtin().unwrap();
    let books = TaxonomyPath::category("intellectual", "books");
    assert!(registry.is_leaf(&books).unwrap());
    assert!(registry.list_children(&books).unwrap().is_empty());
}

#[test]
fn unknown_segments_fail_at_any_depth() {
    let registry = TaxonomyRegistry::builtin().unwrap();
    for path in [
        TaxonomyPath::domain("spiritual"),
        TaxonomyPath::category("intellectual", "movies"),
        TaxonomyPath::subcategory("intellectual", "books", "fiction"),
        TaxonomyPath {
            domain: "intellectual".to_string(),
            category: None,
            subcategory: Some("articles".to_string()),
        },
    ] {
        let err = registry.get_node(&path).unwrap_err();
        assert_eq!(err.path, path);
    }
}

#[test]
fn leaves_under_domain_cover_nested_levels() {
    let registry = TaxonomyRegistry::builtin().unwrap();
    let leaves = registry
        .leaves_under(&TaxonomyPath::domain("intellectual"))
        .unwrap();

    assert!(leaves.iter().all(|leaf| leaf.is_leaf()));
    assert!(leaves
        .iter()
        .any(|leaf| leaf.path == TaxonomyPath::subcategory("intellectual", "professional", "tools")));
    assert!(!leaves
        .iter()
        .any(|leaf| leaf.path == TaxonomyPath::category("intellectual", "professional")));
    assert_eq!(registry.walk().len(), registry.walk().iter().filter(|n| n.is_leaf()).count() + 5);
}
