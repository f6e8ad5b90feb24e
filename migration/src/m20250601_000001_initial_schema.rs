use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        // Create users table with backend-specific ID type
        let user_id_col = match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(Users::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
            _ => ColumnDef::new(Users::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
        };

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(user_id_col)
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(Users::PasswordHash))
                    .col(string_null(Users::Email))
                    .col(big_integer(Users::Created))
                    .to_owned(),
            )
            .await?;

        // Create clients table
        let client_id_col = match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(Clients::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
            _ => ColumnDef::new(Clients::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
        };

        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(client_id_col)
                    .col(
                        ColumnDef::new(Clients::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(Clients::Secret))
                    .col(big_integer(Clients::Created))
                    .to_owned(),
            )
            .await?;

        // Create access_tokens table
        manager
            .create_table(
                Table::create()
                    .table(AccessTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessTokens::Token)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(big_integer(AccessTokens::UserId))
                    .col(big_integer(AccessTokens::ClientId))
                    .col(big_integer(AccessTokens::Created))
                    .col(big_integer(AccessTokens::Expires))
                    .col(
                        ColumnDef::new(AccessTokens::Revoked)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_tokens_user")
                            .from(AccessTokens::Table, AccessTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_tokens_client")
                            .from(AccessTokens::Table, AccessTokens::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on access_tokens.expires
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_access_tokens_expires")
                    .table(AccessTokens::Table)
                    .col(AccessTokens::Expires)
                    .to_owned(),
            )
            .await?;

        // Create products table
        let product_id_col = match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(Products::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
            _ => ColumnDef::new(Products::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
        };

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(product_id_col)
                    .col(
                        ColumnDef::new(Products::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(big_integer(Products::Created))
                    .to_owned(),
            )
            .await?;

        // Create feeds table
        let feed_id_col = match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(Feeds::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
            _ => ColumnDef::new(Feeds::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
        };

        manager
            .create_table(
                Table::create()
                    .table(Feeds::Table)
                    .if_not_exists()
                    .col(feed_id_col)
                    .col(big_integer(Feeds::UserId))
                    .col(big_integer(Feeds::ProductId))
                    .col(string(Feeds::Name))
                    .col(big_integer(Feeds::Created))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feeds_user")
                            .from(Feeds::Table, Feeds::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feeds_product")
                            .from(Feeds::Table, Feeds::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on feeds.user_id for owner lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_feeds_user")
                    .table(Feeds::Table)
                    .col(Feeds::UserId)
                    .to_owned(),
            )
            .await?;

        // Create properties table
        manager
            .create_table(
                Table::create()
                    .table(Properties::Table)
                    .if_not_exists()
                    .col(string(Properties::OwnerKind))
                    .col(big_integer(Properties::OwnerId))
                    .col(big_integer(Properties::ClientId))
                    .col(string(Properties::Key))
                    .col(string(Properties::ValueType))
                    .col(string_null(Properties::Value))
                    .col(big_integer(Properties::Created))
                    .col(big_integer(Properties::Modified))
                    .primary_key(
                        Index::create()
                            .col(Properties::OwnerKind)
                            .col(Properties::OwnerId)
                            .col(Properties::ClientId)
                            .col(Properties::Key),
                    )
                    .to_owned(),
            )
            .await?;

        // Create mirror_registrations table
        manager
            .create_table(
                Table::create()
                    .table(MirrorRegistrations::Table)
                    .if_not_exists()
                    .col(string(MirrorRegistrations::Realm))
                    .col(big_integer(MirrorRegistrations::UserId))
                    .col(big_integer(MirrorRegistrations::ProductId))
                    .col(string(MirrorRegistrations::MirrorToken))
                    .col(big_integer(MirrorRegistrations::Created))
                    .primary_key(
                        Index::create()
                            .col(MirrorRegistrations::Realm)
                            .col(MirrorRegistrations::UserId)
                            .col(MirrorRegistrations::ProductId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mirror_registrations_user")
                            .from(MirrorRegistrations::Table, MirrorRegistrations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mirror_registrations_product")
                            .from(MirrorRegistrations::Table, MirrorRegistrations::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on mirror_registrations (realm, mirror_token) for deletion lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_mirror_registrations_token")
                    .table(MirrorRegistrations::Table)
                    .col(MirrorRegistrations::Realm)
                    .col(MirrorRegistrations::MirrorToken)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MirrorRegistrations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Properties::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Feeds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccessTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Email,
    Created,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    Name,
    Secret,
    Created,
}

#[derive(DeriveIden)]
enum AccessTokens {
    Table,
    Token,
    UserId,
    ClientId,
    Created,
    Expires,
    Revoked,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Created,
}

#[derive(DeriveIden)]
enum Feeds {
    Table,
    Id,
    UserId,
    ProductId,
    Name,
    Created,
}

#[derive(DeriveIden)]
enum Properties {
    Table,
    OwnerKind,
    OwnerId,
    ClientId,
    Key,
    ValueType,
    Value,
    Created,
    Modified,
}

#[derive(DeriveIden)]
enum MirrorRegistrations {
    Table,
    Realm,
    UserId,
    ProductId,
    MirrorToken,
    Created,
}
