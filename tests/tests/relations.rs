use tests::prelude::*;

use pretty_assertions::assert_eq;

fn names(list: &impl List) -> Vec<String> {
    list.column("Name")
        .unwrap()
        .iter()
        .filter_map(Value::to_text)
        .collect()
}

#[test]
fn filtering_through_has_one() {
    let test = DbTest::league();
    let players = test.db.list("Player").unwrap().sort("Name").unwrap();

    let team_one = players.filter(("Team.Title", "Team 1")).unwrap();
    assert_eq!(names(&team_one), ["Bob", "Steve"]);

    let (sql, params) = team_one.sql();
    assert!(sql.contains(r#"LEFT JOIN "Team" AS "team_Team""#), "{sql}");
    assert!(params.contains(&Value::from("Team 1")));
}

#[test]
fn filtering_through_has_many_is_distinct() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    let with_steve = teams.filter(("Players.Name:StartsWith", "S")).unwrap();
    assert_eq!(with_steve.column("Title").unwrap(), [Value::from("Team 1")]);

    let with_any = teams.filter(("Players.Name:PartialMatch", "e")).unwrap();
    assert_eq!(with_any.count().unwrap(), 3);
    assert_eq!(with_any.to_vec().unwrap().len(), 3);

    let (sql, _) = with_any.sql();
    assert!(sql.starts_with("SELECT DISTINCT"), "{sql}");
}

#[test]
fn filtering_through_many_many_extra_fields() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    let big_spenders = teams.filter(("Sponsors.SponsorFee:GreaterThan", 150)).unwrap();
    assert_eq!(
        big_spenders.column("Title").unwrap(),
        [Value::from("Subteam 1"), Value::from("Team 2")]
    );

    let globex = teams.filter(("Sponsors.Name", "Globex")).unwrap();
    assert_eq!(globex.count().unwrap(), 2);
}

#[test]
fn aggregate_filters() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    let high_scorers = teams.filter(("Players.Max(Score):GreaterThan", 4)).unwrap();
    assert_eq!(high_scorers.column("Title").unwrap(), [Value::from("Subteam 1")]);

    let two_players = teams.filter(("Players.Count()", 2)).unwrap();
    assert_eq!(two_players.count().unwrap(), 3);

    let err = assert_err!(teams.filter(("Players.Max(Nope)", 1)));
    assert!(err.to_string().contains("Invalid column"), "{err}");

    let err = assert_err!(teams.filter(("Players.Max(Score", 1)));
    assert!(err.is_invalid_argument(), "{err}");
}

#[test]
fn relation_lists() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    let players = teams
        .filter(("Title", "Team 2"))
        .unwrap()
        .relation("Players")
        .unwrap()
        .sort("Name")
        .unwrap();
    assert_eq!(names(&players), ["Alice", "Mallory"]);

    let captains = teams.relation("Captain").unwrap().sort("Name").unwrap();
    assert_eq!(names(&captains), ["Alice", "Bob", "Dave"]);

    let sponsors = teams
        .filter(("Title", "Team 2"))
        .unwrap()
        .relation("Sponsors")
        .unwrap();
    assert_eq!(names(&sponsors), ["Acme"]);
    assert_eq!(sponsors.column("SponsorFee").unwrap(), [Value::from(200)]);

    let sponsored = test
        .db
        .list("Sponsor")
        .unwrap()
        .filter(("Name", "Globex"))
        .unwrap()
        .relation("Teams")
        .unwrap();
    assert_eq!(sponsored.count().unwrap(), 2);

    let err = assert_err!(teams.relation("Coaches"));
    assert!(err.is_invalid_argument());
}

#[test]
fn subclass_lists() {
    let test = DbTest::league();

    let teams = test.db.list("Team").unwrap();
    assert_eq!(teams.count().unwrap(), 3);

    let sub_teams = test.db.list("SubTeam").unwrap();
    assert_eq!(sub_teams.count().unwrap(), 1);

    let sub_team = sub_teams.first().unwrap().unwrap();
    assert_eq!(sub_team.class(), "SubTeam");
    assert_eq!(sub_team.get("Title"), &Value::from("Subteam 1"));
    assert_eq!(sub_team.get("SubclassDatabaseField"), &Value::from("Subclassed 1"));

    // Base lists revive subclass rows as their own class and carry their
    // fields.
    let revived = teams.filter(("Title", "Subteam 1")).unwrap().first().unwrap().unwrap();
    assert_eq!(revived.class(), "SubTeam");
    assert_eq!(revived.get("SubclassDatabaseField"), &Value::from("Subclassed 1"));

    // Subclass fields are filterable from the base list.
    let filtered = teams.filter(("SubclassDatabaseField", "Subclassed 1")).unwrap();
    assert_eq!(filtered.count().unwrap(), 1);

    let (sql, params) = sub_teams.sql();
    assert!(sql.contains(r#""Team"."ClassName" IN (?)"#), "{sql}");
    assert_eq!(params, [Value::from("SubTeam")]);
}

#[test]
fn subtract() {
    let test = DbTest::league();
    let players = test.db.list("Player").unwrap().sort("Name").unwrap();

    let team_one = players.filter(("TeamID", 1)).unwrap();
    let others = players.subtract(&team_one).unwrap();
    assert_eq!(names(&others), ["Alice", "Carol", "Dave", "Mallory"]);

    let teams = test.db.list("Team").unwrap();
    let err = assert_err!(players.subtract(&teams));
    assert!(err.is_invalid_argument());
}

#[test]
fn aggregates_and_maps() {
    let test = DbTest::league();
    let players = test.db.list("Player").unwrap();

    assert_eq!(players.max("Score").unwrap(), Value::from(6));
    assert_eq!(players.min("Score").unwrap(), Value::from(1));
    assert_eq!(players.sum("Score").unwrap(), Value::from(18));
    assert_eq!(players.filter(("TeamID", 1)).unwrap().avg("Score").unwrap(), Value::from(1.5));

    let by_name = players.map("Name", "Score").unwrap();
    assert_eq!(by_name["Mallory"], Value::from(4));
    assert_eq!(by_name.len(), 6);

    let err = assert_err!(players.max("Nope"));
    assert!(err.is_invalid_argument());
}

#[test]
fn objects_follow_relations_lazily() {
    let test = DbTest::league();
    let bob = test
        .db
        .list("Player")
        .unwrap()
        .filter(("Name", "Bob"))
        .unwrap()
        .first()
        .unwrap()
        .unwrap();

    let team = bob.get_has_one("Team").unwrap().unwrap();
    assert_eq!(team.get("Title"), &Value::from("Team 1"));

    let cards = bob.get_many("Cards").unwrap();
    assert!(!cards.is_eager());
    assert_eq!(cards.count().unwrap(), 2);

    let err = assert_err!(bob.get_has_one("Cards"));
    assert!(err.is_invalid_argument());
}

#[test]
fn raw_joins_and_predicates() {
    let test = DbTest::league();
    let players = test.db.list("Player").unwrap();

    let joined = players
        .inner_join("Team", r#""Team"."ID" = "Player"."TeamID""#, Some("T"))
        .where_((r#""T"."Title""#.to_string(), "Team 2"))
        .sort("Name")
        .unwrap();
    assert_eq!(names(&joined), ["Alice", "Mallory"]);

    let either = players
        .where_any([
            (r#""Player"."Name""#.to_string(), "Bob"),
            (r#""Player"."Name""#.to_string(), "Carol"),
        ])
        .sort("Name")
        .unwrap();
    assert_eq!(names(&either), ["Bob", "Carol"]);
}
