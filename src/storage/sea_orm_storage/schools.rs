use super::SeaOrmStorage;
use crate::entity::schools::{ActiveModel, Column, Entity as Schools};
use crate::errors::{CloneLabError, Result};
use crate::models::schools::School;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

impl SeaOrmStorage {
    /// 创建学校，名称唯一
    pub async fn create_school_impl(&self, name: &str) -> Result<School> {
        let exists = Schools::find()
            .filter(Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("查询学校失败: {e}")))?;
        if exists.is_some() {
            return Err(CloneLabError::validation(format!("学校已存在: {name}")));
        }

        let model = ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("创建学校失败: {e}")))?;

        Ok(result.into_school())
    }

    pub async fn get_school_by_id_impl(&self, id: i64) -> Result<Option<School>> {
        let result = Schools::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("查询学校失败: {e}")))?;

        Ok(result.map(|m| m.into_school()))
    }

    pub async fn list_schools_impl(&self) -> Result<Vec<School>> {
        let schools = Schools::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("查询学校列表失败: {e}")))?;

        Ok(schools.into_iter().map(|m| m.into_school()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::test_storage;
    use crate::errors::CloneLabError;

    #[tokio::test]
    async fn test_duplicate_school_rejected() {
        let storage = test_storage().await;
        storage.create_school_impl("Riverside").await.unwrap();
        let err = storage.create_school_impl("Riverside").await.unwrap_err();
        assert!(matches!(err, CloneLabError::Validation(_)));
        assert_eq!(storage.list_schools_impl().await.unwrap().len(), 1);
    }
}
