pub mod extractor;
pub mod registry;
pub mod resolver;

pub use extractor::{extract_relationships, extract_relationships_cancellable, RelationshipExtractor};
pub use registry::{EntityRegistry, RegisteredEntity};
pub use resolver::{CallResolver, ImportMapping, ResolvedCall};
