pub mod todo;
pub mod token;
pub mod user;

pub use todo::{CreateTodoRequest, Todo, TodoListQuery, TodoStatus, UpdateTodoRequest};
pub use token::{RefreshToken, RefreshTokenRequest, TokenPair};
pub use user::User;
