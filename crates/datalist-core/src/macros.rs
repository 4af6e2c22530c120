/// Builds a [`Record`](crate::Record) from `"Column" => value` pairs.
///
/// ```
/// let row = datalist_core::record! { "ID" => 1, "Name" => "Bob" };
/// assert_eq!(row["Name"], "Bob");
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ( $( $key:expr => $value:expr ),+ $(,)? ) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        record
    }};
}
