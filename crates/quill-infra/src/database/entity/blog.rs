//! Blog entity for SeaORM.

use sea_orm::{NotSet, Set};
use sea_orm::entity::prelude::*;

use quill_core::domain::BlogState;

/// `state` column, stored as text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum State {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
}

impl From<State> for BlogState {
    fn from(state: State) -> Self {
        match state {
            State::Draft => BlogState::Draft,
            State::Published => BlogState::Published,
        }
    }
}

impl From<BlogState> for State {
    fn from(state: BlogState) -> Self {
        match state {
            BlogState::Draft => State::Draft,
            BlogState::Published => State::Published,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "blogs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub tags: Vec<String>,
    pub state: State,
    pub read_count: i64,
    pub reading_time: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to Domain Blog.
impl From<Model> for quill_core::domain::Blog {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            author_id: model.author_id,
            title: model.title,
            description: model.description,
            body: model.body,
            tags: model.tags,
            state: model.state.into(),
            read_count: u64::try_from(model.read_count).unwrap_or_default(),
            reading_time: u32::try_from(model.reading_time).unwrap_or_default(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// Conversion from Domain Blog to SeaORM ActiveModel.
///
/// `read_count` is left `NotSet`: inserts take the column default of 0 and
/// updates never overwrite it. Only `increment_read_count` writes that column.
impl From<quill_core::domain::Blog> for ActiveModel {
    fn from(blog: quill_core::domain::Blog) -> Self {
        Self {
            id: Set(blog.id),
            author_id: Set(blog.author_id),
            title: Set(blog.title),
            description: Set(blog.description),
            body: Set(blog.body),
            tags: Set(blog.tags),
            state: Set(blog.state.into()),
            read_count: NotSet,
            reading_time: Set(i32::try_from(blog.reading_time).unwrap_or(i32::MAX)),
            created_at: Set(blog.created_at.into()),
            updated_at: Set(blog.updated_at.into()),
        }
    }
}
