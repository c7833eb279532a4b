use contract::criteria::LookupCriteria;

/// Quotes a MySQL identifier with back-ticks, doubling embedded back-ticks.
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Builds the lookup statement of `collection` for the given criteria.
///
/// Every criteria column becomes an equality predicate with a positional parameter, in
/// criteria order. Values are bound separately.
pub fn build_select(collection: &str, criteria: &LookupCriteria) -> String {
    let predicates = criteria
        .columns()
        .map(|column| format!("{} = ?", quote_identifier(column)))
        .collect::<Vec<_>>()
        .join(" AND ");

    let mut sql = format!("SELECT * FROM {}", quote_identifier(collection));
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates);
    }

    sql
}
