use crate::entities;
use crate::errors::EsdrError;
use crate::filter::{FilterPredicate, PropertyFilter};
use crate::settings::Database as DbCfg;
use crate::values::{PropertyType, PropertyValue};
use base64ct::Encoding;
use chrono::Utc;
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use serde::{Deserialize, Serialize};

/// Which kind of entity a property hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    Feed,
    User,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Feed => "feed",
            OwnerKind::User => "user",
        }
    }
}

/// A property owner reference: feed or user plus its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: i64,
}

impl Owner {
    pub fn feed(id: i64) -> Owner {
        Owner {
            kind: OwnerKind::Feed,
            id,
        }
    }

    pub fn user(id: i64) -> Owner {
        Owner {
            kind: OwnerKind::User,
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub secret: String,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub user_id: i64,
    pub client_id: i64,
    pub created: i64,
    pub expires: i64,
    pub revoked: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub name: String,
    pub created: i64,
}

/// A property as returned to callers: key plus typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub key: String,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorRegistration {
    pub realm: String,
    pub user_id: i64,
    pub product_id: i64,
    pub mirror_token: String,
    pub created: i64,
}

/// Outcome of a mirror registration attempt. The uniqueness check and the
/// insert are a single statement, so concurrent attempts for the same triple
/// resolve to exactly one Created.
#[derive(Debug, Clone)]
pub enum MirrorCreate {
    Created(MirrorRegistration),
    Duplicate,
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, EsdrError> {
    let db = Database::connect(&cfg.url).await?;
    Ok(db)
}

// User management functions

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    email: Option<String>,
) -> Result<User, EsdrError> {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};

    let created = Utc::now().timestamp();

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| EsdrError::Other(format!("Password hashing failed: {}", e)))?
        .to_string();

    let user = entities::user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        email: Set(email),
        created: Set(created),
        ..Default::default()
    };

    let model = user.insert(db).await?;

    Ok(User {
        id: model.id,
        username: model.username,
        password_hash: model.password_hash,
        email: model.email,
        created: model.created,
    })
}

pub async fn get_user(db: &DatabaseConnection, id: i64) -> Result<Option<User>, EsdrError> {
    use entities::user::{Column, Entity};

    if let Some(model) = Entity::find().filter(Column::Id.eq(id)).one(db).await? {
        Ok(Some(User {
            id: model.id,
            username: model.username,
            password_hash: model.password_hash,
            email: model.email,
            created: model.created,
        }))
    } else {
        Ok(None)
    }
}

pub async fn get_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<User>, EsdrError> {
    use entities::user::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await?
    {
        Ok(Some(User {
            id: model.id,
            username: model.username,
            password_hash: model.password_hash,
            email: model.email,
            created: model.created,
        }))
    } else {
        Ok(None)
    }
}

pub async fn verify_user_password(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<User>, EsdrError> {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let user = match get_user_by_username(db, username).await? {
        Some(u) => u,
        None => return Ok(None),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| EsdrError::Other(format!("Invalid password hash: {}", e)))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
    {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

// Client management functions

pub async fn create_client(db: &DatabaseConnection, name: &str) -> Result<Client, EsdrError> {
    let secret = random_id();
    let created = Utc::now().timestamp();

    let client = entities::client::ActiveModel {
        name: Set(name.to_string()),
        secret: Set(secret),
        created: Set(created),
        ..Default::default()
    };

    let model = client.insert(db).await?;

    Ok(Client {
        id: model.id,
        name: model.name,
        secret: model.secret,
        created: model.created,
    })
}

pub async fn get_client(db: &DatabaseConnection, id: i64) -> Result<Option<Client>, EsdrError> {
    use entities::client::{Column, Entity};

    if let Some(model) = Entity::find().filter(Column::Id.eq(id)).one(db).await? {
        Ok(Some(Client {
            id: model.id,
            name: model.name,
            secret: model.secret,
            created: model.created,
        }))
    } else {
        Ok(None)
    }
}

// Access token functions

pub async fn issue_access_token(
    db: &DatabaseConnection,
    user_id: i64,
    client_id: i64,
    ttl_secs: i64,
) -> Result<AccessToken, EsdrError> {
    let token = random_id();
    let now = Utc::now().timestamp();
    let expires = now + ttl_secs;

    let access_token = entities::access_token::ActiveModel {
        token: Set(token.clone()),
        user_id: Set(user_id),
        client_id: Set(client_id),
        created: Set(now),
        expires: Set(expires),
        revoked: Set(0),
    };

    access_token.insert(db).await?;

    Ok(AccessToken {
        token,
        user_id,
        client_id,
        created: now,
        expires,
        revoked: 0,
    })
}

pub async fn get_access_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<AccessToken>, EsdrError> {
    use entities::access_token::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::Token.eq(token))
        .one(db)
        .await?
    {
        let now = Utc::now().timestamp();
        if model.revoked != 0 || now > model.expires {
            return Ok(None);
        }

        Ok(Some(AccessToken {
            token: model.token,
            user_id: model.user_id,
            client_id: model.client_id,
            created: model.created,
            expires: model.expires,
            revoked: model.revoked,
        }))
    } else {
        Ok(None)
    }
}

// Product functions

pub async fn create_product(db: &DatabaseConnection, name: &str) -> Result<Product, EsdrError> {
    let created = Utc::now().timestamp();

    let product = entities::product::ActiveModel {
        name: Set(name.to_string()),
        created: Set(created),
        ..Default::default()
    };

    let model = product.insert(db).await?;

    Ok(Product {
        id: model.id,
        name: model.name,
        created: model.created,
    })
}

/// Resolves a product reference: all-digit strings look up by id, anything
/// else by name.
pub async fn resolve_product(
    db: &DatabaseConnection,
    product_ref: &str,
) -> Result<Option<Product>, EsdrError> {
    use entities::product::{Column, Entity};

    let found = match product_ref.parse::<i64>() {
        Ok(id) => Entity::find().filter(Column::Id.eq(id)).one(db).await?,
        Err(_) => {
            Entity::find()
                .filter(Column::Name.eq(product_ref))
                .one(db)
                .await?
        }
    };

    Ok(found.map(|model| Product {
        id: model.id,
        name: model.name,
        created: model.created,
    }))
}

// Feed functions

pub async fn create_feed(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    name: &str,
) -> Result<Feed, EsdrError> {
    let created = Utc::now().timestamp();

    let feed = entities::feed::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        name: Set(name.to_string()),
        created: Set(created),
        ..Default::default()
    };

    let model = feed.insert(db).await?;

    Ok(Feed {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        name: model.name,
        created: model.created,
    })
}

pub async fn get_feed(db: &DatabaseConnection, id: i64) -> Result<Option<Feed>, EsdrError> {
    use entities::feed::{Column, Entity};

    if let Some(model) = Entity::find().filter(Column::Id.eq(id)).one(db).await? {
        Ok(Some(Feed {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            name: model.name,
            created: model.created,
        }))
    } else {
        Ok(None)
    }
}

// Property functions

fn decode_property(model: entities::property::Model) -> Result<StoredValue, EsdrError> {
    let ptype = PropertyType::parse(&model.value_type)
        .ok_or_else(|| EsdrError::Other(format!("Unknown property type: {}", model.value_type)))?;
    let value = PropertyValue::from_payload(ptype, model.value.as_deref())?;
    Ok(StoredValue {
        key: model.key,
        value,
    })
}

/// Upserts a property. An existing record for the same tuple is replaced
/// wholesale, type tag included; `created` is kept, `modified` refreshed.
pub async fn set_property(
    db: &DatabaseConnection,
    owner: Owner,
    client_id: i64,
    key: &str,
    value: &PropertyValue,
) -> Result<StoredValue, EsdrError> {
    use entities::property::{Column, Entity};
    use sea_orm::sea_query::OnConflict;

    let now = Utc::now().timestamp();
    let payload = value.to_payload()?;

    let property = entities::property::ActiveModel {
        owner_kind: Set(owner.kind.as_str().to_string()),
        owner_id: Set(owner.id),
        client_id: Set(client_id),
        key: Set(key.to_string()),
        value_type: Set(value.property_type().as_str().to_string()),
        value: Set(payload),
        created: Set(now),
        modified: Set(now),
    };

    Entity::insert(property)
        .on_conflict(
            OnConflict::columns([
                Column::OwnerKind,
                Column::OwnerId,
                Column::ClientId,
                Column::Key,
            ])
            .update_columns([Column::ValueType, Column::Value, Column::Modified])
            .to_owned(),
        )
        .exec(db)
        .await?;

    Ok(StoredValue {
        key: key.to_string(),
        value: value.clone(),
    })
}

/// Looks up one property for exactly this owner+client+key tuple. A key held
/// by a different client is not visible here.
pub async fn get_property(
    db: &DatabaseConnection,
    owner: Owner,
    client_id: i64,
    key: &str,
) -> Result<Option<StoredValue>, EsdrError> {
    use entities::property::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::OwnerKind.eq(owner.kind.as_str()))
        .filter(Column::OwnerId.eq(owner.id))
        .filter(Column::ClientId.eq(client_id))
        .filter(Column::Key.eq(key))
        .one(db)
        .await?
    {
        Ok(Some(decode_property(model)?))
    } else {
        Ok(None)
    }
}

fn predicate_expr(pred: &FilterPredicate) -> sea_orm::sea_query::SimpleExpr {
    use entities::property::Column;

    match pred {
        FilterPredicate::Key(key) => Column::Key.eq(key.as_str()),
        FilterPredicate::Type(ptype) => Column::ValueType.eq(ptype.as_str()),
    }
}

/// Lists the client's properties for an owner, optionally narrowed by
/// filter predicates. Row order is not specified.
pub async fn get_properties(
    db: &DatabaseConnection,
    owner: Owner,
    client_id: i64,
    filter: &PropertyFilter,
) -> Result<Vec<StoredValue>, EsdrError> {
    use entities::property::{Column, Entity};

    let mut condition = Condition::all()
        .add(Column::OwnerKind.eq(owner.kind.as_str()))
        .add(Column::OwnerId.eq(owner.id))
        .add(Column::ClientId.eq(client_id));

    for pred in &filter.all {
        condition = condition.add(predicate_expr(pred));
    }

    if !filter.any.is_empty() {
        let mut any = Condition::any();
        for pred in &filter.any {
            any = any.add(predicate_expr(pred));
        }
        condition = condition.add(any);
    }

    let models = Entity::find().filter(condition).all(db).await?;

    models.into_iter().map(decode_property).collect()
}

pub async fn delete_property(
    db: &DatabaseConnection,
    owner: Owner,
    client_id: i64,
    key: &str,
) -> Result<u64, EsdrError> {
    use entities::property::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::OwnerKind.eq(owner.kind.as_str()))
        .filter(Column::OwnerId.eq(owner.id))
        .filter(Column::ClientId.eq(client_id))
        .filter(Column::Key.eq(key))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Deletes every property this client holds for the owner. Other clients'
/// records for the same owner stay put.
pub async fn delete_properties(
    db: &DatabaseConnection,
    owner: Owner,
    client_id: i64,
) -> Result<u64, EsdrError> {
    use entities::property::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::OwnerKind.eq(owner.kind.as_str()))
        .filter(Column::OwnerId.eq(owner.id))
        .filter(Column::ClientId.eq(client_id))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

// Mirror registration functions

pub async fn create_mirror_registration(
    db: &DatabaseConnection,
    realm: &str,
    user_id: i64,
    product_id: i64,
) -> Result<MirrorCreate, EsdrError> {
    use entities::mirror_registration::{Column, Entity};
    use sea_orm::sea_query::OnConflict;

    let mirror_token = generate_mirror_token();
    let created = Utc::now().timestamp();

    let registration = entities::mirror_registration::ActiveModel {
        realm: Set(realm.to_string()),
        user_id: Set(user_id),
        product_id: Set(product_id),
        mirror_token: Set(mirror_token.clone()),
        created: Set(created),
    };

    let rows = Entity::insert(registration)
        .on_conflict(
            OnConflict::columns([Column::Realm, Column::UserId, Column::ProductId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if rows == 0 {
        return Ok(MirrorCreate::Duplicate);
    }

    Ok(MirrorCreate::Created(MirrorRegistration {
        realm: realm.to_string(),
        user_id,
        product_id,
        mirror_token,
        created,
    }))
}

/// Deletes by (realm, token). The token is the sole credential; a miss is
/// reported as zero rows, never an error.
pub async fn delete_mirror_registration(
    db: &DatabaseConnection,
    realm: &str,
    mirror_token: &str,
) -> Result<u64, EsdrError> {
    use entities::mirror_registration::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::Realm.eq(realm))
        .filter(Column::MirrorToken.eq(mirror_token))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

fn random_id() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64ct::Base64UrlUnpadded::encode_string(&bytes)
}

/// Generate a 64-character hex mirror token (256 bits of entropy).
fn generate_mirror_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
