use crate::contract::model::User;
use crate::infra::storage::entity::Model as UserEntity;

/// Convert a database entity to a contract model
impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            email: entity.email,
        }
    }
}
