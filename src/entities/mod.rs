pub mod category_document;
pub mod task_document;

pub use category_document::Entity as CategoryDocument;
pub use task_document::Entity as TaskDocument;
