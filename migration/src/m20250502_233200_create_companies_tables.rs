use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Countries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Countries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Countries::IsoCode).string_len(3).not_null().unique_key())
                    .col(ColumnDef::new(Countries::Name).string_len(200).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Companies::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Companies::CompaniesHouseId).string_len(8).not_null().default(""))
                    .col(ColumnDef::new(Companies::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Companies::Description).text().not_null().default(""))
                    .col(ColumnDef::new(Companies::DateFounded).date().null())
                    .col(ColumnDef::new(Companies::CountryId).integer().not_null())
                    .col(ColumnDef::new(Companies::CreatorId).integer().null())
                    .col(
                        ColumnDef::new(Companies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Companies::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // countries can't be removed while a company points at them
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-companies-country_id")
                            .from(Companies::Table, Companies::CountryId)
                            .to(Countries::Table, Countries::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-companies-creator_id")
                            .from(Companies::Table, Companies::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompanyMonitors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CompanyMonitors::CompanyId).integer().not_null())
                    .col(ColumnDef::new(CompanyMonitors::UserId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(CompanyMonitors::CompanyId)
                            .col(CompanyMonitors::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-company_monitors-company_id")
                            .from(CompanyMonitors::Table, CompanyMonitors::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-company_monitors-user_id")
                            .from(CompanyMonitors::Table, CompanyMonitors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Deals::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Deals::CompanyId).integer().not_null())
                    .col(ColumnDef::new(Deals::DateOfDeal).date().not_null())
                    .col(ColumnDef::new(Deals::AmountRaised).double().not_null())
                    .col(
                        ColumnDef::new(Deals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-deals-company_id")
                            .from(Deals::Table, Deals::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employees::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Employees::CompanyId).integer().not_null())
                    .col(ColumnDef::new(Employees::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Employees::JobTitle).string_len(200).not_null())
                    .col(ColumnDef::new(Employees::Gender).string_len(1).not_null())
                    .col(ColumnDef::new(Employees::Email).string_len(254).not_null())
                    .col(ColumnDef::new(Employees::PhoneNumber).string_len(20).not_null().default(""))
                    .col(
                        ColumnDef::new(Employees::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-employees-company_id")
                            .from(Employees::Table, Employees::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-employees-company_id-email")
                    .table(Employees::Table)
                    .col(Employees::CompanyId)
                    .col(Employees::Email)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Employees::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CompanyMonitors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Countries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Countries {
    Table,
    Id,
    IsoCode,
    Name,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    CompaniesHouseId,
    Name,
    Description,
    DateFounded,
    CountryId,
    CreatorId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CompanyMonitors {
    Table,
    CompanyId,
    UserId,
}

#[derive(DeriveIden)]
enum Deals {
    Table,
    Id,
    CompanyId,
    DateOfDeal,
    AmountRaised,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    CompanyId,
    Name,
    JobTitle,
    Gender,
    Email,
    PhoneNumber,
    CreatedAt,
}
