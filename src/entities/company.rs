use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;
use chrono::{DateTime, Utc};

use crate::validation::validate_date_founded;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub companies_house_id: String, // external registry id, may be blank
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub date_founded: Option<Date>,
    pub country_id: i32,
    pub creator_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Country,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Creator,
    #[sea_orm(has_many = "super::company_monitor::Entity")]
    CompanyMonitor,
    #[sea_orm(has_many = "super::deal::Entity")]
    Deal,
    #[sea_orm(has_many = "super::employee::Entity")]
    Employee,
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl Related<super::company_monitor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompanyMonitor.def()
    }
}

impl Related<super::deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Every write goes through the founding date check and bumps the
    /// timestamps, so raw ActiveModel saves can't sneak a future date in.
    ///
    /// A rejected date comes back as `DbErr::Custom` holding the
    /// [`ValidationError`](crate::validation::ValidationError) message. Only
    /// the `store` functions return it typed, as `StoreError::Validation`;
    /// they check before writing, so this hook never fires on their path.
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(Some(date)) | ActiveValue::Unchanged(Some(date)) = &self.date_founded {
            validate_date_founded(Some(*date), Utc::now().date_naive())
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }

        let now = Utc::now();
        if insert {
            self.created_at = ActiveValue::Set(now);
        }
        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}
