use tests::prelude::*;

use datalist::JoinMeta;
use pretty_assertions::assert_eq;

fn items() -> EagerLoadedList {
    let mut list = EagerLoadedList::plain("Item");
    list.add_rows(three_items()).unwrap();
    list
}

#[test]
fn rows_need_a_valid_id() {
    let mut list = EagerLoadedList::plain("Item");

    for row in [
        record! { "ID" => Value::Null },
        record! { "ID" => "" },
        record! { "ID" => Value::List(vec![1.into(), 2.into(), 3.into()]) },
        record! { "Name" => "no id" },
    ] {
        let err = assert_err!(list.add_row(row.clone()));
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("must have a valid ID"), "{row:?}: {err}");
    }

    assert_eq!(list.count().unwrap(), 0);
    assert_ok!(list.add_row(record! { "ID" => "7" }));
    assert_eq!(list.column("ID").unwrap(), [Value::from("7")]);
}

#[test]
fn lookups() {
    let list = items();

    assert_eq!(list.by_id(2).unwrap().unwrap().get("Name"), &Value::from("test obj 2"));
    assert_none!(list.by_id(9).unwrap());

    let picked = list.by_ids(&[3, 1]).unwrap();
    assert_eq!(picked.count().unwrap(), 2);

    assert_eq!(list.get(1).unwrap().unwrap().id(), Some(2));
    assert_none!(list.get(5).unwrap());
    assert!(list.exists().unwrap());
    assert!(!list.filter(("ID", 9)).unwrap().exists().unwrap());
}

#[test]
fn map_and_each() {
    let list = items();

    let names = list.map("ID", "Name").unwrap();
    assert_eq!(names["1"], Value::from("test obj 1"));
    assert_eq!(names.len(), 3);

    let mut seen = vec![];
    list.each(|object| seen.push(object.id().unwrap())).unwrap();
    assert_eq!(seen, [1, 2, 3]);
}

#[test]
fn remove_duplicates_by_field() {
    let list = items();

    let unique = list.remove_duplicates(Some("Created")).unwrap();
    let ids: Vec<_> = unique.iter().filter_map(DataObject::id).collect();
    assert_eq!(ids, [1, 2]);

    assert_eq!(list.remove_duplicates(None).unwrap().len(), 3);
}

#[test]
fn membership_changes_are_rejected() {
    let mut list = items();

    assert!(assert_err!(list.set_by_id_list(&[1])).is_bad_method_call());
    assert!(assert_err!(list.for_foreign_id(1)).is_bad_method_call());
    assert!(assert_err!(list.offset_set(0, record! { "ID" => 4 })).is_bad_method_call());
    assert!(assert_err!(list.offset_unset(0)).is_bad_method_call());
    assert_eq!(list.count().unwrap(), 3);
}

#[test]
fn shapes() {
    let err = assert_err!(EagerLoadedList::new("Player", ListShape::HasMany, None, None));
    assert!(err.is_invalid_argument());

    let players = EagerLoadedList::new("Player", ListShape::HasMany, Some(1), None).unwrap();
    assert_eq!(players.foreign_id(), Some(1));
    assert!(assert_err!(players.get_extra_data("Players", 1)).is_bad_method_call());

    let err = assert_err!(EagerLoadedList::new("Sponsor", ListShape::ManyMany, Some(1), None));
    assert!(err.is_invalid_argument());

    let join = JoinMeta {
        relation: "Sponsors".to_string(),
        join_table: "Team_Sponsors".to_string(),
        parent_key: "TeamID".to_string(),
        child_key: "SponsorID".to_string(),
        extra_fields: vec!["SponsorFee".to_string()],
    };
    let mut sponsors =
        EagerLoadedList::new("Sponsor", ListShape::ManyMany, Some(1), Some(join)).unwrap();
    sponsors
        .add_row(record! { "ID" => 5, "Name" => "Acme", "SponsorFee" => 100 })
        .unwrap()
        .add_row(record! { "ID" => 6, "Name" => "Globex" })
        .unwrap();

    assert_eq!(
        sponsors.get_extra_data("Sponsors", 5).unwrap(),
        record! { "SponsorFee" => 100 }
    );
    assert_eq!(
        sponsors.get_extra_data("Sponsors", "6").unwrap(),
        record! { "SponsorFee" => Value::Null }
    );
    assert!(assert_err!(sponsors.get_extra_data("Sponsors", "six")).is_invalid_argument());
}

#[test]
fn attached_data_by_parent() {
    let mut teams = EagerLoadedList::plain("Team");
    teams
        .add_rows([record! { "ID" => 1 }, record! { "ID" => 2 }])
        .unwrap();

    let mut first = EagerLoadedList::new("Player", ListShape::HasMany, Some(1), None).unwrap();
    first
        .add_rows([record! { "ID" => 10, "Name" => "Bob" }, record! { "ID" => 11, "Name" => "Steve" }])
        .unwrap();
    let mut second = EagerLoadedList::new("Player", ListShape::HasMany, Some(2), None).unwrap();
    second.add_row(record! { "ID" => 12, "Name" => "Alice" }).unwrap();

    teams
        .add_eager_loaded_data("Players", 1, EagerData::Many(first))
        .add_eager_loaded_data("Players", 2, EagerData::Many(second));

    let EagerData::Many(all) = teams.relation("Players").unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(all.sort("Name").unwrap().column("Name").unwrap().len(), 3);

    let team = teams.by_id(2).unwrap().unwrap();
    let AnyList::Eager(players) = team.get_many("Players").unwrap() else {
        panic!("expected an eager list");
    };
    assert_eq!(players.first().unwrap().unwrap().get("Name"), &Value::from("Alice"));

    let only_first = teams.filter(("ID", 1)).unwrap();
    let EagerData::Many(firsts) = only_first.relation("Players").unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(firsts.count().unwrap(), 2);
}

#[test]
fn relations_with_nothing_attached() {
    let mut players = EagerLoadedList::plain("Player");
    players.add_row(record! { "ID" => 1, "Name" => "Bob" }).unwrap();

    let err = assert_err!(players.relation("NoSuchRelation"));
    assert!(err.is_invalid_argument());

    players.add_eager_loaded_data("Team", 1, EagerData::One(None));
    assert!(matches!(players.relation("Team").unwrap(), EagerData::One(None)));

    let test = DbTest::league();
    let mut teams = EagerLoadedList::plain("Team").with_db(test.db.clone());
    teams.add_row(record! { "ID" => 1, "Title" => "Team 1" }).unwrap();

    let EagerData::Many(players) = teams.relation("Players").unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(players.data_class(), "Player");
    assert_eq!(players.count().unwrap(), 0);

    let EagerData::Many(sponsors) = teams.relation("Sponsors").unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(sponsors.data_class(), "Sponsor");
    assert_eq!(sponsors.count().unwrap(), 0);

    assert!(matches!(teams.relation("Captain").unwrap(), EagerData::One(None)));

    let err = assert_err!(teams.relation("NoSuchRelation"));
    assert!(err.is_invalid_argument());
    assert_eq!(test.log.selects(), 0);
}
