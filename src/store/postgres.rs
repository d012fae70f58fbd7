use async_trait::async_trait;
use sqlx::{
    postgres::PgPoolOptions, types::Json, Executor, Pool, Postgres, Row, Transaction,
};
use uuid::Uuid;

use crate::entities::{Place, User};
use crate::error::{database_error, transaction_aborted_error, Error};
use crate::store::{Store, UnitOfWork};

type Database = Postgres;

pub struct PgStore {
    pool: Pool<Database>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip_all)]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        // TODO: move this to sqlx migrations
        pool.execute("CREATE TABLE IF NOT EXISTS users (id UUID PRIMARY KEY, email VARCHAR NOT NULL UNIQUE, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS places (id UUID PRIMARY KEY, creator_id UUID NOT NULL, data JSONB NOT NULL, CONSTRAINT fk_place_creator FOREIGN KEY(creator_id) REFERENCES users(id))")
            .await?;

        tracing::info!("schema ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip(self))]
    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(sqlx::query("SELECT data FROM places WHERE id = $1").bind(&id))
            .await?;

        match maybe_result {
            Some(row) => {
                let Json(place): Json<Place> = row.try_get("data")?;
                Ok(Some(place))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(sqlx::query("SELECT data FROM users WHERE id = $1").bind(&id))
            .await?;

        match maybe_result {
            Some(row) => {
                let Json(user): Json<User> = row.try_get("data")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_places(&self, ids: &[Uuid]) -> Result<Vec<Place>, Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(sqlx::query("SELECT data FROM places WHERE id = ANY($1)").bind(ids.to_vec()))
            .await?;

        let mut found = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(place): Json<Place> = row.try_get("data")?;
            found.push(place);
        }

        // keep the order of the owner's list
        let places = ids
            .iter()
            .filter_map(|id| found.iter().position(|p| &p.id == id))
            .map(|i| found[i].clone())
            .collect();

        Ok(places)
    }

    #[tracing::instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, Error> {
        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(sqlx::query("SELECT data FROM users ORDER BY email ASC"))
            .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(user): Json<User> = row.try_get("data")?;
            users.push(user);
        }

        Ok(users)
    }

    #[tracing::instrument(skip(self))]
    async fn update_place(&self, place: &Place) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query("UPDATE places SET data = $2 WHERE id = $1")
                    .bind(&place.id)
                    .bind(Json(place)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(database_error(format!("place {} vanished", place.id)));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, Error> {
        let tx = self.pool.begin().await?;

        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// Wraps a live transaction. sqlx rolls the transaction back when it is
/// dropped without being committed.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Database>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    #[tracing::instrument(skip(self))]
    async fn insert_place(&mut self, place: &Place) -> Result<(), Error> {
        self.tx
            .execute(
                sqlx::query("INSERT INTO places (id, creator_id, data) VALUES ($1, $2, $3)")
                    .bind(&place.id)
                    .bind(&place.creator)
                    .bind(Json(place)),
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove_place(&mut self, id: Uuid) -> Result<(), Error> {
        let result = self
            .tx
            .execute(sqlx::query("DELETE FROM places WHERE id = $1").bind(&id))
            .await?;

        if result.rows_affected() == 0 {
            return Err(database_error(format!("place {} vanished", id)));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn link_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<(), Error> {
        let mut user = fetch_user_for_update(&mut self.tx, &user_id).await?;

        user.link_place(place_id);

        update_user(&mut self.tx, &user).await
    }

    #[tracing::instrument(skip(self))]
    async fn unlink_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<(), Error> {
        let mut user = fetch_user_for_update(&mut self.tx, &user_id).await?;

        user.unlink_place(&place_id);

        update_user(&mut self.tx, &user).await
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let this = *self;

        this.tx.commit().await.map_err(|err| {
            tracing::error!(?err, "commit failed");
            transaction_aborted_error()
        })
    }
}

#[tracing::instrument(skip(tx))]
async fn fetch_user_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<User, Error> {
    let Json(user): Json<User> = tx
        .fetch_optional(sqlx::query("SELECT data FROM users WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| database_error(format!("user {} vanished", id)))?
        .try_get("data")?;

    Ok(user)
}

#[tracing::instrument(skip(tx))]
async fn update_user(tx: &mut Transaction<'_, Database>, user: &User) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE users SET data = $2 WHERE id = $1")
            .bind(&user.id)
            .bind(Json(user)),
    )
    .await?;

    Ok(())
}
