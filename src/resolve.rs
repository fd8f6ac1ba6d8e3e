/*!
Set arithmetic over rosters.

Nothing in here touches the database; the `store` module fetches the
relations and these functions combine them.
*/
use std::collections::{BTreeSet, HashSet};

/**
Students present in _every_ one of `rosters`, sorted ascending.

An empty slice of rosters has no meaningful intersection and yields an
empty list; callers are expected to have rejected that case already.
*/
pub fn common_students(rosters: &[HashSet<String>]) -> Vec<String> {
    log::trace!("common_students( [ {} rosters ] ) called.", rosters.len());

    let (first, rest) = match rosters.split_first() {
        Some(x) => x,
        None => { return Vec::new(); },
    };

    let common: BTreeSet<&String> = first.iter()
        .filter(|s| rest.iter().all(|r| r.contains(*s)))
        .collect();

    common.into_iter().cloned().collect()
}

/**
Union of a teacher's reachable `roster` and the `tagged` students who
qualified on their own, sorted and deduplicated.

Both inputs are expected to be already filtered for suspension.
*/
pub fn notification_recipients<R, T>(roster: R, tagged: T) -> Vec<String>
where
    R: IntoIterator<Item = String>,
    T: IntoIterator<Item = String>,
{
    let recipients: BTreeSet<String> = roster.into_iter()
        .chain(tagged)
        .collect();

    recipients.into_iter().collect()
}

/// Distinct addresses from `mentions`, first appearance wins.
pub fn distinct_mentions<'a>(mentions: &[&'a str]) -> Vec<&'a str> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(mentions.len());
    mentions.iter()
        .filter(|m| seen.insert(**m))
        .copied()
        .collect()
}
