//! Random URL keys which let teams and adjudicators reach their own pages
//! (such as the feedback form) without an account.

use std::collections::HashSet;

use diesel::{
    connection::LoadConnection, dsl::exists, prelude::*, select,
    sqlite::Sqlite,
};
use rand::{Rng, distr::Alphanumeric};

use crate::{
    schema::{adjudicators, tournament_teams},
    tournaments::{
        Tournament, feedback::aggregate::adjudicator_pool_query,
        participants::{Adjudicator, Team},
    },
};

pub mod view;

pub const URL_KEY_LENGTH: usize = 16;

pub fn generate_url_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(URL_KEY_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(thiserror::Error, Debug)]
pub enum UrlKeyError {
    #[error(
        "There are already randomised URLs. You must use the `urlkeys` command to populate or delete randomised URLs."
    )]
    AlreadyExist,
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlKeyOwnerKind {
    Team,
    Adjudicator,
}

impl UrlKeyOwnerKind {
    pub fn label(&self) -> &'static str {
        match self {
            UrlKeyOwnerKind::Team => "Team",
            UrlKeyOwnerKind::Adjudicator => "Adjudicator",
        }
    }
}

#[derive(Clone, Debug)]
pub struct UrlKeyOwner {
    pub kind: UrlKeyOwnerKind,
    pub id: String,
    pub name: String,
    pub url_key: Option<String>,
}

/// The teams of the tournament followed by its adjudicators (including the
/// shared pool, if the tournament uses it).
pub fn url_key_owners(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<UrlKeyOwner>> {
    let teams = tournament_teams::table
        .filter(tournament_teams::tournament_id.eq(&tournament.id))
        .order_by(tournament_teams::name.asc())
        .select(Team::as_select())
        .load::<Team>(conn)?;
    let adjudicators = adjudicator_pool_query(tournament)
        .order_by(adjudicators::name.asc())
        .load::<Adjudicator>(conn)?;

    Ok(teams
        .into_iter()
        .map(|team| UrlKeyOwner {
            kind: UrlKeyOwnerKind::Team,
            id: team.id,
            name: team.name,
            url_key: team.url_key,
        })
        .chain(adjudicators.into_iter().map(|adj| UrlKeyOwner {
            kind: UrlKeyOwnerKind::Adjudicator,
            id: adj.id,
            name: adj.name,
            url_key: adj.url_key,
        }))
        .collect())
}

/// Gives every owner without a key a fresh one. Keys are distinct within the
/// batch; the UNIQUE indexes on both tables catch any clash with a key
/// assigned earlier. Returns the number of keys assigned.
pub fn populate_url_keys(
    owners: &[UrlKeyOwner],
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<usize> {
    let mut drawn = HashSet::new();
    let mut assigned = 0;

    for owner in owners.iter().filter(|owner| owner.url_key.is_none()) {
        let key = loop {
            let key = generate_url_key();
            if drawn.insert(key.clone()) {
                break key;
            }
        };

        match owner.kind {
            UrlKeyOwnerKind::Team => {
                diesel::update(tournament_teams::table.find(&owner.id))
                    .set(tournament_teams::url_key.eq(&key))
                    .execute(conn)?;
            }
            UrlKeyOwnerKind::Adjudicator => {
                diesel::update(adjudicators::table.find(&owner.id))
                    .set(adjudicators::url_key.eq(&key))
                    .execute(conn)?;
            }
        }
        assigned += 1;
    }

    Ok(assigned)
}

pub fn any_url_keys_exist(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<bool> {
    let teams = select(exists(
        tournament_teams::table.filter(
            tournament_teams::tournament_id
                .eq(&tournament.id)
                .and(tournament_teams::url_key.is_not_null()),
        ),
    ))
    .get_result::<bool>(conn)?;
    if teams {
        return Ok(true);
    }

    let adjudicator = adjudicator_pool_query(tournament)
        .filter(adjudicators::url_key.is_not_null())
        .first::<Adjudicator>(conn)
        .optional()?;
    Ok(adjudicator.is_some())
}

/// Assigns keys to every team and adjudicator, but only if none of them has
/// one yet. Either every owner gets a key or nothing changes.
#[tracing::instrument(skip(tournament, conn), fields(tournament = %tournament.id))]
pub fn generate_tournament_url_keys(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<usize, UrlKeyError> {
    conn.transaction(|conn| {
        if any_url_keys_exist(tournament, conn)? {
            return Err(UrlKeyError::AlreadyExist);
        }

        let owners = url_key_owners(tournament, conn)?;
        let assigned = populate_url_keys(&owners, conn)?;
        tracing::info!(assigned, "generated url keys");
        Ok(assigned)
    })
}

/// Removes the keys of the tournament's teams and adjudicators. Keys held by
/// the shared pool are only removed when the tournament uses it.
pub fn delete_tournament_url_keys(
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<usize> {
    conn.transaction(|conn| {
        let teams = diesel::update(
            tournament_teams::table
                .filter(tournament_teams::tournament_id.eq(&tournament.id)),
        )
        .set(tournament_teams::url_key.eq(None::<String>))
        .execute(conn)?;

        let adj_ids: Vec<String> = adjudicator_pool_query(tournament)
            .load::<Adjudicator>(conn)?
            .into_iter()
            .map(|adj| adj.id)
            .collect();
        let adjs = diesel::update(
            adjudicators::table.filter(adjudicators::id.eq_any(adj_ids)),
        )
        .set(adjudicators::url_key.eq(None::<String>))
        .execute(conn)?;

        Ok(teams + adjs)
    })
}

#[cfg(test)]
mod tests {
    use diesel::{Connection, SqliteConnection};
    use diesel_migrations::MigrationHarness;

    use super::*;
    use crate::{MIGRATIONS, schema::tournaments};

    fn setup(share_adjs: bool) -> (SqliteConnection, Tournament) {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();

        diesel::insert_into(tournaments::table)
            .values((
                tournaments::id.eq("t1"),
                tournaments::name.eq("Test Open"),
                tournaments::abbrv.eq("TO"),
                tournaments::slug.eq("test-open"),
                tournaments::created_at.eq(chrono::Utc::now().naive_utc()),
                tournaments::share_adjs.eq(share_adjs),
            ))
            .execute(&mut conn)
            .unwrap();

        for (id, name) in [("tm1", "Alpha"), ("tm2", "Beta")] {
            diesel::insert_into(tournament_teams::table)
                .values((
                    tournament_teams::id.eq(id),
                    tournament_teams::tournament_id.eq("t1"),
                    tournament_teams::name.eq(name),
                ))
                .execute(&mut conn)
                .unwrap();
        }
        for (id, tid) in [("a1", Some("t1")), ("a2", Some("t1")), ("a3", None)]
        {
            diesel::insert_into(adjudicators::table)
                .values((
                    adjudicators::id.eq(id),
                    adjudicators::tournament_id.eq(tid),
                    adjudicators::name.eq(id),
                ))
                .execute(&mut conn)
                .unwrap();
        }

        let tournament = Tournament::fetch("t1", &mut conn).unwrap();
        (conn, tournament)
    }

    fn all_keys(conn: &mut SqliteConnection) -> Vec<Option<String>> {
        let mut keys = tournament_teams::table
            .select(tournament_teams::url_key)
            .load::<Option<String>>(conn)
            .unwrap();
        keys.extend(
            adjudicators::table
                .order_by(adjudicators::id.asc())
                .select(adjudicators::url_key)
                .load::<Option<String>>(conn)
                .unwrap(),
        );
        keys
    }

    #[test]
    fn keys_are_alphanumeric() {
        let key = generate_url_key();
        assert_eq!(key.len(), URL_KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generates_distinct_keys_including_shared_pool() {
        let (mut conn, tournament) = setup(true);
        assert!(!any_url_keys_exist(&tournament, &mut conn).unwrap());

        let assigned =
            generate_tournament_url_keys(&tournament, &mut conn).unwrap();
        assert_eq!(assigned, 5);

        let keys: Vec<String> =
            all_keys(&mut conn).into_iter().map(Option::unwrap).collect();
        let distinct: HashSet<_> = keys.iter().collect();
        assert_eq!(distinct.len(), keys.len());
    }

    #[test]
    fn pool_is_left_alone_when_not_shared() {
        let (mut conn, tournament) = setup(false);
        assert_eq!(
            generate_tournament_url_keys(&tournament, &mut conn).unwrap(),
            4
        );

        let pool_key = adjudicators::table
            .find("a3")
            .select(adjudicators::url_key)
            .first::<Option<String>>(&mut conn)
            .unwrap();
        assert!(pool_key.is_none());
    }

    #[test]
    fn second_run_changes_nothing() {
        let (mut conn, tournament) = setup(true);
        generate_tournament_url_keys(&tournament, &mut conn).unwrap();
        let before = all_keys(&mut conn);

        assert!(matches!(
            generate_tournament_url_keys(&tournament, &mut conn),
            Err(UrlKeyError::AlreadyExist)
        ));
        assert_eq!(all_keys(&mut conn), before);
    }

    #[test]
    fn populate_only_fills_gaps_and_delete_clears() {
        let (mut conn, tournament) = setup(false);
        diesel::update(tournament_teams::table.find("tm1"))
            .set(tournament_teams::url_key.eq("existingkey00000"))
            .execute(&mut conn)
            .unwrap();

        let owners = url_key_owners(&tournament, &mut conn).unwrap();
        assert_eq!(populate_url_keys(&owners, &mut conn).unwrap(), 3);

        let kept = tournament_teams::table
            .find("tm1")
            .select(tournament_teams::url_key)
            .first::<Option<String>>(&mut conn)
            .unwrap();
        assert_eq!(kept.as_deref(), Some("existingkey00000"));

        delete_tournament_url_keys(&tournament, &mut conn).unwrap();
        assert!(!any_url_keys_exist(&tournament, &mut conn).unwrap());
    }
}
