use tests::prelude::*;

use datalist::Filter;
use pretty_assertions::assert_eq;

fn ids(list: &impl List) -> Vec<i64> {
    list.to_vec()
        .unwrap()
        .iter()
        .filter_map(DataObject::id)
        .collect()
}

fn eager_items() -> EagerLoadedList {
    let mut list = EagerLoadedList::plain("Item");
    list.add_rows(three_items()).unwrap();
    list
}

fn check_three_row_scenario(list: &impl List) {
    let created = list.filter(("Created", "2023-01-01 00:00:00")).unwrap();
    assert_eq!(ids(&created), [2, 3]);

    let not_null = list.filter(("SomeField:not", None::<String>)).unwrap();
    assert_eq!(ids(&not_null), [1, 2]);

    let not_named = list.filter(("Name:not", "test obj 1")).unwrap();
    assert_eq!(ids(&not_named), [2, 3]);
}

#[test]
fn three_row_scenario_on_a_data_list() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();
    check_three_row_scenario(&list);
}

#[test]
fn three_row_scenario_on_an_eager_loaded_list() {
    check_three_row_scenario(&eager_items());
}

#[test]
fn derived_lists_leave_the_source_untouched() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();
    let before = ids(&list);

    let _ = list.filter(("Name", "test obj 1")).unwrap();
    let _ = list.exclude(("Name", "test obj 1")).unwrap();
    let _ = list.sort("Name DESC").unwrap();
    let _ = list.limit(1, 0).unwrap();
    let _ = list.distinct(false);
    assert_eq!(ids(&list), before);

    let eager = eager_items();
    let before = ids(&eager);
    let _ = eager.filter(("Name", "test obj 1")).unwrap();
    let _ = eager.sort("Name DESC").unwrap();
    let _ = eager.limit(1, 0).unwrap();
    assert_eq!(ids(&eager), before);
}

#[test]
fn filter_and_exclude_are_complementary() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();
    let eager = eager_items();

    let filters: Vec<Filter> = vec![
        ("Name", "test obj 1").into(),
        ("SomeField", "a").into(),
        ("SomeField", None::<String>).into(),
        ("Name:PartialMatch", "obj 2").into(),
        ("ID:GreaterThan", 1).into(),
        ("ID", [1, 3]).into(),
    ];

    for filter in filters {
        for (kept, removed, all) in [
            (
                ids(&list.filter(filter.clone()).unwrap()),
                ids(&list.exclude(filter.clone()).unwrap()),
                ids(&list),
            ),
            (
                ids(&eager.filter(filter.clone()).unwrap()),
                ids(&eager.exclude(filter.clone()).unwrap()),
                ids(&eager),
            ),
        ] {
            assert!(
                kept.iter().all(|id| !removed.contains(id)),
                "{filter:?}: {kept:?} and {removed:?} overlap"
            );
            let mut union: Vec<i64> = kept.iter().chain(&removed).copied().collect();
            union.sort();
            assert_eq!(union, all, "{filter:?}");
        }
    }
}

#[test]
fn exclude_through_to_many_relations_is_complementary() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap().sort("ID").unwrap();
    let all = ids(&teams);
    assert_eq!(all, [1, 2, 3]);

    let filters: Vec<(Filter, Vec<i64>)> = vec![
        (("Players.Name", "Bob").into(), vec![1]),
        (("Sponsors.Name", "Globex").into(), vec![1, 3]),
        (("Players.Cards.Title", "Yellow").into(), vec![1, 2, 3]),
        (("Players.Score:GreaterThan", 3).into(), vec![2, 3]),
        (
            Filter::new().and("Players.Name", "Bob").and("Title", "Team 1"),
            vec![1],
        ),
    ];

    for (filter, expected) in filters {
        let kept = ids(&teams.filter(filter.clone()).unwrap());
        let removed = ids(&teams.exclude(filter.clone()).unwrap());
        assert_eq!(kept, expected, "{filter:?}");

        let rest: Vec<i64> = all.iter().copied().filter(|id| !kept.contains(id)).collect();
        assert_eq!(removed, rest, "{filter:?}");
    }

    let either = Filter::new().and("Players.Name", "Alice").and("Title", "Team 1");
    assert_eq!(ids(&teams.filter_any(either.clone()).unwrap()), [1, 2]);
    assert_eq!(ids(&teams.exclude_any(either).unwrap()), [3]);

    let (sql, _) = teams.exclude(("Players.Name", "Bob")).unwrap().sql();
    assert!(sql.contains(r#""Team"."ID" NOT IN (SELECT"#), "{sql}");
}

#[test]
fn negated_empty_string_includes_null_rows() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();

    let not_empty = list.filter(("SomeField:not", "")).unwrap();
    assert_eq!(ids(&not_empty), [1, 2, 3]);
    assert_eq!(ids(&eager_items().filter(("SomeField:not", "")).unwrap()), [1, 2, 3]);

    let empty_or_b = list.filter(("SomeField", ["", "b"])).unwrap();
    assert_eq!(ids(&empty_or_b), [2]);
}

#[test]
fn filter_any_and_exclude_any() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();
    let eager = eager_items();

    let filter = Filter::new()
        .and("Name", "test obj 1")
        .and("SomeField", "b");

    assert_eq!(ids(&list.filter_any(filter.clone()).unwrap()), [1, 2]);
    assert_eq!(ids(&eager.filter_any(filter.clone()).unwrap()), [1, 2]);
    assert_eq!(ids(&list.exclude_any(filter.clone()).unwrap()), [3]);
    assert_eq!(ids(&eager.exclude_any(filter.clone()).unwrap()), [3]);

    // Both entries must match for `exclude` to remove a row.
    assert_eq!(ids(&list.exclude(filter.clone()).unwrap()), [1, 2, 3]);
    assert_eq!(ids(&eager.exclude(filter).unwrap()), [1, 2, 3]);
}

#[test]
fn case_modifiers() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();
    let eager = eager_items();

    for list in [AnyList::Lazy(list), AnyList::Eager(eager)] {
        assert_eq!(ids(&list.filter(("Name", "TEST OBJ 1")).unwrap()), [1]);
        assert!(ids(&list.filter(("Name:case", "TEST OBJ 1")).unwrap()).is_empty());
        assert_eq!(ids(&list.filter(("Name:StartsWith:nocase", "TEST")).unwrap()), [1, 2, 3]);
        assert!(ids(&list.filter(("Name:EndsWith:case", "OBJ 3")).unwrap()).is_empty());
        assert_eq!(ids(&list.filter(("Name:EndsWith", "obj 3")).unwrap()), [3]);
    }
}

#[test]
fn comparison_matchers() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();
    let eager = eager_items();

    for list in [AnyList::Lazy(list), AnyList::Eager(eager)] {
        assert_eq!(ids(&list.filter(("ID:GreaterThan", 1)).unwrap()), [2, 3]);
        assert_eq!(ids(&list.filter(("ID:GreaterThanOrEqual", 2)).unwrap()), [2, 3]);
        assert_eq!(ids(&list.filter(("ID:LessThan", 2)).unwrap()), [1]);
        assert_eq!(ids(&list.filter(("ID:LessThanOrEqual:not", 2)).unwrap()), [3]);
        assert_eq!(
            ids(&list.filter(("Created:LessThan", "2020-01-01")).unwrap()),
            [1]
        );
    }
}

#[test]
fn invalid_filters() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap();
    let eager = eager_items();

    let err = assert_err!(list.filter(("Name:Bogus", "x")));
    assert!(err.is_not_found(), "{err}");
    assert!(err.to_string().contains("does not exist"));

    let err = assert_err!(list.filter(("Name", Vec::<String>::new())));
    assert!(err.is_invalid_argument());

    // Negating an empty set matches everything.
    let all = list.filter(("Name:not", Vec::<String>::new())).unwrap();
    assert_eq!(all.count().unwrap(), 3);

    let err = assert_err!(eager.filter(("Team.Title", "x")));
    assert!(err.to_string().contains("Can't filter by column"));
}

#[test]
fn introspection_does_not_query() {
    let test = DbTest::league();
    let list = test.db.list("Player").unwrap();

    assert!(list.can_filter_by("Name"));
    assert!(list.can_filter_by("Team.Title"));
    assert!(list.can_filter_by("TeamID"));
    assert!(!list.can_filter_by("Nope"));
    assert!(!list.can_filter_by("Team.Nope"));

    assert!(list.can_sort_by("Name"));
    assert!(list.can_sort_by("Team.Title"));
    assert!(!list.can_sort_by("Cards.Title"));

    assert_eq!(test.log.selects(), 0);
}
