use tests::prelude::*;

use datalist::schema::{FieldType, ModelBuilder};
use datalist::Schema;
use pretty_assertions::assert_eq;

#[test]
fn connect_by_url() {
    let db = Db::builder()
        .schema(items_schema())
        .connect("sqlite::memory:")
        .unwrap();
    db.push_schema().unwrap();

    insert(&db, "Item", record! { "Name" => "first" });
    assert_eq!(db.list("Item").unwrap().count().unwrap(), 1);

    let err = assert_err!(Db::builder().schema(items_schema()).connect("nope://x"));
    assert!(err.to_string().contains("unsupported database"), "{err}");

    let err = assert_err!(Db::builder().connect("sqlite::memory:"));
    assert!(err.is_invalid_schema());
}

#[test]
fn write_update_and_delete() {
    let test = DbTest::new(league_schema());

    let mut team = DataObject::new("SubTeam");
    team.set("Title", "Reds").set("SubclassDatabaseField", "sub");
    let id = test.db.write(&mut team).unwrap();
    assert_eq!(team.id(), Some(id));
    assert_eq!(team.get("ClassName"), &Value::from("SubTeam"));

    team.set("Title", "Blues").set("SubclassDatabaseField", "changed");
    assert_eq!(test.db.write(&mut team).unwrap(), id);

    let loaded = test.db.get_by_id("Team", id).unwrap().unwrap();
    assert_eq!(loaded.class(), "SubTeam");
    assert_eq!(loaded.get("Title"), &Value::from("Blues"));
    assert_eq!(loaded.get("SubclassDatabaseField"), &Value::from("changed"));

    test.db.delete(&loaded).unwrap();
    assert_none!(test.db.get_by_id("Team", id).unwrap());
    assert_eq!(test.db.list("SubTeam").unwrap().count().unwrap(), 0);

    let err = assert_err!(test.db.delete(&DataObject::new("Team")));
    assert!(err.is_invalid_argument());
}

#[test]
fn many_many_links() {
    let test = DbTest::new(league_schema());

    let team_id = test.insert("Team", record! { "Title" => "Reds" });
    let sponsor = test.insert("Sponsor", record! { "Name" => "Acme" });
    let team = test.db.get_by_id("Team", team_id).unwrap().unwrap();

    test.db
        .add_many_many(&team, "Sponsors", sponsor, record! { "SponsorFee" => 5 })
        .unwrap();
    assert_eq!(team.get_many("Sponsors").unwrap().count().unwrap(), 1);

    let err = assert_err!(test.db.add_many_many(&team, "Sponsors", sponsor, record! { "Bogus" => 1 }));
    assert!(err.is_invalid_argument());

    let err = assert_err!(test.db.add_many_many(&team, "Players", sponsor, record! {}));
    assert!(err.is_invalid_argument());

    test.db.remove_many_many(&team, "Sponsors", sponsor).unwrap();
    assert_eq!(team.get_many("Sponsors").unwrap().count().unwrap(), 0);
}

#[test]
fn get_one_caches_until_flushed() {
    let mut test = DbTest::league();

    let bob = test.db.get_one("Player", ("Name", "Bob"), true).unwrap().unwrap();
    assert_eq!(bob.get("Name"), &Value::from("Bob"));
    assert_eq!(test.log.selects(), 1);

    let again = test.db.get_one("Player", ("Name", "Bob"), true).unwrap().unwrap();
    assert_eq!(again.id(), bob.id());
    assert_eq!(test.log.selects(), 1);

    // Misses are remembered too.
    assert_none!(test.db.get_one("Player", ("Name", "Nobody"), true).unwrap());
    assert_none!(test.db.get_one("Player", ("Name", "Nobody"), true).unwrap());
    assert_eq!(test.log.selects(), 2);

    // Uncached lookups always query.
    test.log.clear();
    test.db.get_one("Player", ("Name", "Bob"), false).unwrap();
    assert_eq!(test.log.selects(), 1);

    test.db.flush_cache().unwrap();
    test.log.clear();
    test.db.get_one("Player", ("Name", "Bob"), true).unwrap();
    assert_eq!(test.log.selects(), 1);
}

#[test]
fn default_sorts_are_inherited() {
    let schema = Schema::builder()
        .model(
            ModelBuilder::new("Page")
                .field("Title", FieldType::Varchar)
                .field("Sort", FieldType::Int)
                .default_sort("Sort DESC"),
        )
        .model(ModelBuilder::new("BlogPage").extends("Page"))
        .build()
        .unwrap();
    let test = DbTest::new(schema);

    for (title, sort) in [("a", 1), ("b", 3), ("c", 2)] {
        test.insert("BlogPage", record! { "Title" => title, "Sort" => sort });
    }

    let titles = test.db.list("BlogPage").unwrap().column("Title").unwrap();
    assert_eq!(titles, [Value::from("b"), Value::from("c"), Value::from("a")]);
}

#[test]
fn statements_are_logged_with_parameters() {
    let mut test = items_db(&three_items());

    test.db
        .list("Item")
        .unwrap()
        .filter(("Name", "test obj 2"))
        .unwrap()
        .to_vec()
        .unwrap();

    let (operation, response) = test.log.pop().unwrap();
    assert!(operation.is_query());
    let sql = &operation.sql().text;
    assert!(sql.contains("WHERE") && sql.contains(r#""Item"."Name""#), "{sql}");
    assert_eq!(operation.sql().params, [Value::from("test obj 2")]);
    assert_eq!(response.into_records().len(), 1);
    assert!(test.log.is_empty());
}
