use tests::prelude::*;

use pretty_assertions::assert_eq;

fn ids(list: &impl List) -> Vec<i64> {
    list.to_vec()
        .unwrap()
        .iter()
        .filter_map(DataObject::id)
        .collect()
}

fn names(list: &impl List) -> Vec<String> {
    list.column("Name")
        .unwrap()
        .iter()
        .filter_map(Value::to_text)
        .collect()
}

fn players() -> Vec<Record> {
    ["Steve", "Bob", "Mallory", "alice"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| record! { "ID" => i as i64 + 1, "Name" => name })
        .collect()
}

/// A database list and an eager list over the same rows, as read back from
/// the database.
fn both(rows: &[Record]) -> (DbTest, DataList, EagerLoadedList) {
    let test = items_db(rows);
    let list = test.db.list("Item").unwrap();

    let mut eager = EagerLoadedList::plain("Item");
    eager.add_rows(list.records().unwrap()).unwrap();

    (test, list, eager)
}

#[test]
fn direction_spellings_agree() {
    let (_test, list, eager) = both(&players());

    let expected = ["alice", "Bob", "Mallory", "Steve"];
    for list in [AnyList::Lazy(list), AnyList::Eager(eager)] {
        assert_eq!(names(&list.sort("Name").unwrap()), expected);
        assert_eq!(names(&list.sort("Name ASC").unwrap()), expected);
        assert_eq!(names(&list.sort(("Name", "asc")).unwrap()), expected);
        assert_eq!(names(&list.sort([("Name", "ascending")]).unwrap()), expected);

        let err = assert_err!(list.sort(("Name", "BACKWARDS")));
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("BACKWARDS"));
    }
}

#[test]
fn sort_then_reverse_swaps_first_and_last() {
    let (_test, list, eager) = both(&players());
    let named = |object: Option<DataObject>| object.unwrap().get("Name").to_text().unwrap();

    let list = list.filter(("Name", ["Bob", "Mallory", "Steve"])).unwrap();
    let eager = eager.filter(("Name", ["Bob", "Mallory", "Steve"])).unwrap();

    for list in [AnyList::Lazy(list), AnyList::Eager(eager)] {
        let sorted = list.sort("Name").unwrap();
        assert_eq!(named(sorted.first().unwrap()), "Bob");
        assert_eq!(named(sorted.last().unwrap()), "Steve");

        let reversed = sorted.reverse();
        assert_eq!(named(reversed.first().unwrap()), "Steve");
        assert_eq!(named(reversed.last().unwrap()), "Bob");

        // The source list keeps its order.
        assert_eq!(named(sorted.first().unwrap()), "Bob");
    }
}

#[test]
fn sort_parity_between_database_and_memory() {
    let numeric = [1.5, 10.0, 2.0, -3.0, 2.25]
        .into_iter()
        .enumerate()
        .map(|(i, amount)| record! { "ID" => i as i64 + 1, "Amount" => amount })
        .collect::<Vec<_>>();

    let numeric_strings = ["10", "9", "100", "1a", "09"]
        .into_iter()
        .enumerate()
        .map(|(i, code)| record! { "ID" => i as i64 + 1, "Code" => code })
        .collect::<Vec<_>>();

    let mixed_case = ["bob", "Alice", "carol", "Dave", "eve", "Frank"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| record! { "ID" => i as i64 + 1, "Name" => name })
        .collect::<Vec<_>>();

    for (rows, field) in [(numeric, "Amount"), (numeric_strings, "Code"), (mixed_case, "Name")] {
        let (_test, list, eager) = both(&rows);

        for direction in ["ASC", "DESC"] {
            let sort = format!("{field} {direction}");
            assert_eq!(
                ids(&list.sort(sort.as_str()).unwrap()),
                ids(&eager.sort(sort.as_str()).unwrap()),
                "{sort}"
            );
        }
    }
}

#[test]
fn nulls_sort_first() {
    let (_test, list, eager) = both(&three_items());

    for list in [AnyList::Lazy(list), AnyList::Eager(eager)] {
        assert_eq!(ids(&list.sort("SomeField").unwrap()), [3, 1, 2]);
        assert_eq!(ids(&list.sort("SomeField DESC").unwrap()), [2, 1, 3]);
    }
}

#[test]
fn multi_term_sorts() {
    let (_test, list, eager) = both(&three_items());

    for list in [AnyList::Lazy(list), AnyList::Eager(eager)] {
        assert_eq!(ids(&list.sort("Created DESC, ID ASC").unwrap()), [2, 3, 1]);
        assert_eq!(
            ids(&list.sort([("Created", "DESC"), ("ID", "DESC")]).unwrap()),
            [3, 2, 1]
        );
        assert_eq!(ids(&list.sort("Created DESC, ID").unwrap().reverse()), [1, 3, 2]);
    }
}

#[test]
fn reversing_an_unsorted_list_orders_by_descending_id() {
    let (_test, list, eager) = both(&three_items());
    assert!(!list.sql().0.contains("ORDER BY"));

    for list in [AnyList::Lazy(list), AnyList::Eager(eager)] {
        let reversed = list.reverse();
        assert_eq!(ids(&reversed), [3, 2, 1]);
        assert_eq!(reversed.first().unwrap().unwrap().id(), Some(3));
        assert_eq!(reversed.last().unwrap().unwrap().id(), Some(1));
        assert_eq!(ids(&reversed.reverse()), [1, 2, 3]);
    }
}

#[test]
fn clearing_a_sort() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    // Teams sort by title by default.
    assert_eq!(
        teams.column("Title").unwrap(),
        [Value::from("Subteam 1"), Value::from("Team 1"), Value::from("Team 2")]
    );

    let (sql, _) = teams.sort(None::<&str>).unwrap().sql();
    assert!(!sql.contains("ORDER BY"), "{sql}");
}

#[test]
fn sorting_through_relations() {
    let test = DbTest::league();
    let players = test.db.list("Player").unwrap();

    let sorted = players.sort("Team.Title DESC, Name").unwrap();
    assert_eq!(
        names(&sorted),
        ["Alice", "Mallory", "Bob", "Steve", "Carol", "Dave"]
    );

    let err = assert_err!(test.db.list("Team").unwrap().sort("Players.Name"));
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("non-linear"));

    let eager = EagerLoadedList::plain("Player");
    let err = assert_err!(eager.sort("Team.Title"));
    assert!(err.is_invalid_argument());
}

#[test]
fn unknown_sort_columns_are_rejected() {
    let test = DbTest::league();
    let players = test.db.list("Player").unwrap();

    assert!(!players.can_sort_by("Nope"));
    let err = assert_err!(players.sort("Nope"));
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("Nope"), "{err}");

    let err = assert_err!(players.sort("Name, Nope DESC"));
    assert!(err.is_invalid_argument());

    // Extra fields of a many_many relation are selected, so they sort.
    let sponsors = test
        .db
        .list("Team")
        .unwrap()
        .filter(("Title", "Team 1"))
        .unwrap()
        .relation("Sponsors")
        .unwrap();
    assert!(sponsors.can_sort_by("SponsorFee"));
    assert_eq!(names(&sponsors.sort("SponsorFee").unwrap()), ["Globex", "Acme"]);
    assert_eq!(names(&sponsors.sort("SponsorFee DESC").unwrap()), ["Acme", "Globex"]);
    assert!(!sponsors.can_sort_by("Nope"));
}
