use tests::prelude::*;

use pretty_assertions::assert_eq;

/// Touches every relation the league fixture populates, returning what
/// was found so loading strategies can be compared.
fn traverse(teams: &[DataObject]) -> Vec<String> {
    let mut seen = vec![];

    for team in teams {
        let title = team.get("Title").to_text().unwrap();

        let captain = team.get_has_one("Captain").unwrap().unwrap();
        seen.push(format!("{title} captain {}", captain.get("Name").to_text().unwrap()));

        for player in team.get_many("Players").unwrap().sort("Name").unwrap().to_vec().unwrap() {
            let cards = player.get_many("Cards").unwrap().count().unwrap();
            seen.push(format!(
                "{title} player {} cards {cards}",
                player.get("Name").to_text().unwrap()
            ));
        }

        for sponsor in team.get_many("Sponsors").unwrap().sort("Name").unwrap().to_vec().unwrap() {
            seen.push(format!(
                "{title} sponsor {} fee {:?}",
                sponsor.get("Name").to_text().unwrap(),
                sponsor.get("SponsorFee").as_i64()
            ));
        }

        for fan in team.get_many("Fans").unwrap().to_vec().unwrap() {
            seen.push(format!("{title} fan {}", fan.get("Name").to_text().unwrap()));
        }
    }

    seen
}

#[test]
fn eager_loading_never_costs_more_queries() {
    let mut test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    let strategies: [&[&str]; 5] = [
        &[],
        &["Players"],
        &["Players.Cards"],
        &["Players.Cards", "Captain"],
        &["Players.Cards", "Captain", "Sponsors", "Fans"],
    ];

    let mut expected = None;
    let mut counts = vec![];

    for paths in strategies {
        test.log.clear();

        let list = teams.eager_load(paths.iter().copied()).unwrap();
        let seen = traverse(&list.to_vec().unwrap());

        match &expected {
            None => expected = Some(seen),
            Some(expected) => assert_eq!(&seen, expected, "{paths:?}"),
        }
        counts.push(test.log.selects());
    }

    // Lazy: one for the teams, then per team a captain, the players, one
    // per player for cards, the sponsors and the fans.
    assert_eq!(counts[0], 1 + 3 * 6);
    // Fully eager: one for the teams plus one per relation segment.
    assert_eq!(counts[4], 6);

    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "query counts regressed: {counts:?}");
    }
}

#[test]
fn eager_loaded_data_matches_lazy_loading() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    let lazy = traverse(&teams.to_vec().unwrap());
    // Three captains, six players, five sponsorships and three fans.
    assert_eq!(lazy.len(), 17);
    assert!(lazy.contains(&"Team 1 captain Bob".to_string()));
    assert!(lazy.contains(&"Team 2 sponsor Acme fee Some(200)".to_string()));
    assert!(lazy.contains(&"Subteam 1 fan Fan of Subteam 1".to_string()));
    assert!(lazy.contains(&"Team 1 player Steve cards 2".to_string()));
}

#[test]
fn many_many_extra_data_is_available_in_memory() {
    let mut test = DbTest::league();
    let teams = test
        .db
        .list("Team")
        .unwrap()
        .filter(("Title", "Team 1"))
        .unwrap()
        .eager_load(["Sponsors"])
        .unwrap()
        .to_vec()
        .unwrap();
    test.log.clear();

    let AnyList::Eager(sponsors) = teams[0].get_many("Sponsors").unwrap() else {
        panic!("expected an eager-loaded list");
    };

    assert_eq!(sponsors.shape(), ListShape::ManyMany);
    assert_eq!(sponsors.foreign_id(), teams[0].id());

    let acme = sponsors.filter(("Name", "Acme")).unwrap().first().unwrap().unwrap();
    let extra = sponsors.get_extra_data("Sponsors", acme.id().unwrap()).unwrap();
    assert_eq!(extra, record! { "SponsorFee" => 100 });

    assert!(assert_err!(sponsors.get_extra_data("Teams", acme.id().unwrap())).is_invalid_argument());
    assert_eq!(test.log.selects(), 0);
}

#[test]
fn nested_relations_are_served_from_memory() {
    let mut test = DbTest::league();
    let teams = test
        .db
        .list("Team")
        .unwrap()
        .eager_load(["Players.Team", "Players.Cards"])
        .unwrap()
        .to_vec()
        .unwrap();
    test.log.clear();

    for team in &teams {
        let players = team.get_many("Players").unwrap();
        assert!(players.is_eager());

        for player in players.to_vec().unwrap() {
            let back = player.get_has_one("Team").unwrap().unwrap();
            assert_eq!(back.id(), team.id());
            assert_eq!(back.class(), team.class());
            assert_eq!(player.get_many("Cards").unwrap().count().unwrap(), 2);
        }
    }

    assert_eq!(test.log.selects(), 0);
}

#[test]
fn depth_limit() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    assert_ok!(teams.eager_load(["Players.Cards.Player"]));

    let err = assert_err!(teams.eager_load(["Players.Cards.Player.Team"]));
    assert!(err.is_invalid_argument());
    let message = err.to_string();
    assert!(
        message.contains("only supports up to 3 levels of nesting, passed 4 levels"),
        "{message}"
    );
    assert!(message.contains("Players.Cards.Player.Team"), "{message}");
}

#[test]
fn unknown_relations_fail_immediately() {
    let test = DbTest::league();
    let teams = test.db.list("Team").unwrap();

    let err = assert_err!(teams.eager_load(["Players.Coaches"]));
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("Coaches"));
    assert_eq!(test.log.selects(), 0);
}

#[test]
fn empty_parent_sets_skip_relation_queries() {
    let mut test = DbTest::league();
    let none = test
        .db
        .list("Team")
        .unwrap()
        .filter(("Title", "No such team"))
        .unwrap()
        .eager_load(["Players.Cards", "Sponsors"])
        .unwrap();

    test.log.clear();
    assert!(none.to_vec().unwrap().is_empty());
    assert_eq!(test.log.selects(), 1);
}

#[test]
fn polymorphic_has_ones_cannot_be_eager_loaded() {
    let test = DbTest::league();
    let fans = test.db.list("Fan").unwrap();

    let err = assert_err!(fans.eager_load(["Favourite"]));
    assert!(err.is_invalid_argument());

    // Lazily the class column picks the target.
    let fan = fans.filter(("Name", "Fan of Subteam 1")).unwrap().first().unwrap().unwrap();
    let favourite = fan.get_has_one("Favourite").unwrap().unwrap();
    assert_eq!(favourite.class(), "SubTeam");
    assert_eq!(favourite.get("SubclassDatabaseField"), &Value::from("Subclassed 1"));
}
