//! Shared schema and seed data for the integration tests.

use crate::{ExecLog, LoggingDriver};
use datalist::{
    schema::{FieldType, ModelBuilder},
    DataObject, Db, Record, Schema,
};
use datalist_core::record;
use datalist_driver_sqlite::Sqlite;

/// A database over a fresh in-memory SQLite file with every statement
/// logged.
pub struct DbTest {
    pub db: Db,
    pub log: ExecLog,
}

impl DbTest {
    pub fn new(schema: Schema) -> DbTest {
        let driver = LoggingDriver::new(Box::new(Sqlite::in_memory()));
        let log = ExecLog::new(driver.ops_log_handle());

        let db = Db::builder().schema(schema).build(driver).unwrap();
        db.push_schema().unwrap();

        let mut test = DbTest { db, log };
        test.log.clear();
        test
    }

    /// The league schema seeded with [`seed_league`].
    pub fn league() -> DbTest {
        let mut test = DbTest::new(league_schema());
        seed_league(&test.db);
        test.log.clear();
        test
    }

    pub fn insert(&self, class: &str, fields: Record) -> i64 {
        insert(&self.db, class, fields)
    }
}

pub fn insert(db: &Db, class: &str, fields: Record) -> i64 {
    let mut object = DataObject::with_record(class, fields);
    db.write(&mut object).unwrap()
}

/// Teams, their players, sponsors and fans.
pub fn league_schema() -> Schema {
    Schema::builder()
        .model(
            ModelBuilder::new("Team")
                .field("Title", FieldType::Varchar)
                .field("DatabaseField", FieldType::Varchar)
                .default_sort("Title")
                .has_one("Captain", "Player")
                .has_many("Players", "Player.Team")
                .has_many("Fans", "Fan.Favourite")
                .many_many_extra("Sponsors", "Sponsor", [("SponsorFee", FieldType::Int)]),
        )
        .model(
            ModelBuilder::new("SubTeam")
                .extends("Team")
                .field("SubclassDatabaseField", FieldType::Varchar),
        )
        .model(
            ModelBuilder::new("Player")
                .field("Name", FieldType::Varchar)
                .field("Score", FieldType::Int)
                .has_one("Team", "Team")
                .has_many("Cards", "Card"),
        )
        .model(
            ModelBuilder::new("Card")
                .field("Title", FieldType::Varchar)
                .has_one("Player", "Player"),
        )
        .model(
            ModelBuilder::new("Sponsor")
                .field("Name", FieldType::Varchar)
                .belongs_many_many("Teams", "Team"),
        )
        .model(
            ModelBuilder::new("Fan")
                .field("Name", FieldType::Varchar)
                .has_one_polymorphic("Favourite"),
        )
        .build()
        .unwrap()
}

/// Three teams (one a `SubTeam`), two players per team with two cards each,
/// two sponsors and a fan per team.
///
/// Team IDs are 1 to 3; player IDs are 1 to 6, team by team.
pub fn seed_league(db: &Db) {
    let teams = [
        ("Team", "Team 1", None),
        ("Team", "Team 2", None),
        ("SubTeam", "Subteam 1", Some("Subclassed 1")),
    ];

    let players = [
        ["Bob", "Steve"],
        ["Alice", "Mallory"],
        ["Dave", "Carol"],
    ];

    let acme = insert(db, "Sponsor", record! { "Name" => "Acme" });
    let globex = insert(db, "Sponsor", record! { "Name" => "Globex" });

    for ((class, title, sub), names) in teams.into_iter().zip(players) {
        let mut fields = record! { "Title" => title, "DatabaseField" => format!("{title} field") };
        if let Some(sub) = sub {
            fields.insert("SubclassDatabaseField".into(), sub.into());
        }
        let team = insert(db, class, fields);

        let mut captain = None;
        for (score, name) in names.into_iter().enumerate() {
            let player = insert(
                db,
                "Player",
                record! { "Name" => name, "Score" => (score as i64 + 1) * team, "TeamID" => team },
            );
            captain.get_or_insert(player);

            for card in ["Yellow", "Red"] {
                insert(db, "Card", record! { "Title" => card, "PlayerID" => player });
            }
        }

        let mut object = DataObject::with_record(class, record! { "ID" => team });
        object.set("CaptainID", captain.unwrap_or_default());
        db.write(&mut object).unwrap();

        insert(
            db,
            "Fan",
            record! { "Name" => format!("Fan of {title}"), "FavouriteID" => team, "FavouriteClass" => class },
        );

        let owner = DataObject::with_record(class, record! { "ID" => team });
        db.add_many_many(&owner, "Sponsors", acme, record! { "SponsorFee" => 100 * team })
            .unwrap();
        if team != 2 {
            db.add_many_many(&owner, "Sponsors", globex, record! { "SponsorFee" => 10 * team })
                .unwrap();
        }
    }
}

/// A single `Item` model with a nullable text field.
pub fn items_schema() -> Schema {
    Schema::builder()
        .model(
            ModelBuilder::new("Item")
                .field("Name", FieldType::Varchar)
                .field("SomeField", FieldType::Varchar)
                .field("Amount", FieldType::Decimal)
                .field("Code", FieldType::Varchar),
        )
        .build()
        .unwrap()
}

/// Three rows with known `Created` dates, the third with a null `SomeField`.
pub fn three_items() -> Vec<Record> {
    vec![
        record! {
            "ID" => 1,
            "Name" => "test obj 1",
            "Created" => "2013-01-01 00:00:00",
            "SomeField" => "a",
        },
        record! {
            "ID" => 2,
            "Name" => "test obj 2",
            "Created" => "2023-01-01 00:00:00",
            "SomeField" => "b",
        },
        record! {
            "ID" => 3,
            "Name" => "test obj 3",
            "Created" => "2023-01-01 00:00:00",
            "SomeField" => None::<String>,
        },
    ]
}

/// [`DbTest`] over [`items_schema`] holding `rows`.
pub fn items_db(rows: &[Record]) -> DbTest {
    let mut test = DbTest::new(items_schema());
    for row in rows {
        test.insert("Item", row.clone());
    }
    test.log.clear();
    test
}
