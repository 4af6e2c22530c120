use tests::prelude::*;

use datalist::LimitLength;

fn eager_items() -> EagerLoadedList {
    let mut list = EagerLoadedList::plain("Item");
    list.add_rows(three_items()).unwrap();
    list
}

/// `(length, offset, expected count)` over a three-row source.
fn boundary_table() -> Vec<(LimitLength, i64, usize)> {
    vec![
        (None::<i64>.into(), 0, 3),
        (2.into(), 0, 2),
        (4.into(), 0, 3),
        (0.into(), 0, 0),
        (false.into(), 0, 0),
        (None::<i64>.into(), 2, 1),
        (1.into(), 1, 1),
    ]
}

#[test]
fn limit_boundaries_on_a_data_list() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap();

    for (length, offset, expected) in boundary_table() {
        let limited = assert_ok!(list.limit(length, offset));
        assert_eq!(
            limited.to_vec().unwrap().len(),
            expected,
            "limit({length:?}, {offset})"
        );
    }
}

#[test]
fn limit_boundaries_on_an_eager_loaded_list() {
    let list = eager_items();

    for (length, offset, expected) in boundary_table() {
        let limited = assert_ok!(list.limit(length, offset));
        assert_eq!(
            limited.to_vec().unwrap().len(),
            expected,
            "limit({length:?}, {offset})"
        );
        assert_eq!(limited.count().unwrap(), expected);
    }
}

#[test]
fn negative_limits_are_rejected() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap();
    let eager = eager_items();

    assert!(assert_err!(list.limit(-1, 0)).is_invalid_argument());
    assert!(assert_err!(list.limit(1, -1)).is_invalid_argument());
    assert!(assert_err!(eager.limit(-1, 0)).is_invalid_argument());
    assert!(assert_err!(eager.limit(1, -1)).is_invalid_argument());
}

#[test]
fn zero_length_lists_run_no_row_query() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().limit(0, 0).unwrap();

    assert_none!(list.first().unwrap());
    assert!(!list.exists().unwrap());
    assert_eq!(test.log.selects(), 0);

    assert!(list.to_vec().unwrap().is_empty());
}

#[test]
fn count_respects_limit() {
    let test = items_db(&three_items());
    let list = test.db.list("Item").unwrap();

    assert_eq!(list.count().unwrap(), 3);
    assert_eq!(list.limit(2, 0).unwrap().count().unwrap(), 2);
    assert_eq!(list.limit(None::<i64>, 1).unwrap().count().unwrap(), 2);
}

#[test]
fn first_and_last_respect_the_window() {
    let mut test = items_db(&three_items());
    let list = test.db.list("Item").unwrap().sort("ID").unwrap();

    let window = list.limit(2, 1).unwrap();
    assert_eq!(window.first().unwrap().unwrap().id(), Some(2));
    assert_eq!(window.last().unwrap().unwrap().id(), Some(3));

    test.log.clear();
    let head = list.limit(2, 0).unwrap();
    assert_eq!(head.last().unwrap().unwrap().id(), Some(2));
    let tail = list.limit(None::<i64>, 1).unwrap();
    assert_eq!(tail.last().unwrap().unwrap().id(), Some(3));
    assert_eq!(test.log.selects(), 2);

    assert_none!(list.limit(2, 5).unwrap().last().unwrap());
    assert_none!(list.limit(0, 0).unwrap().last().unwrap());

    let eager = eager_items().sort("ID").unwrap().limit(2, 0).unwrap();
    assert_eq!(eager.first().unwrap().unwrap().id(), Some(1));
    assert_eq!(eager.last().unwrap().unwrap().id(), Some(2));
}
