//! Read-only descriptors for protobuf schemas.
//!
//! A loaded schema version is a [SchemaFile]: the ordered top-level messages
//! and enums of one `.proto` file plus a [DescriptorPool] that can resolve any
//! qualified type name reachable from it. Nested types live flat in the pool
//! and fields refer to them by qualified name.
//!
//! ```
//! use protodiff_schema::*;
//!
//! let mut pool = DescriptorPool::new();
//! pool.add_enum(EnumDescriptor::new("shop.Color", vec![
//!     EnumValueDescriptor::new("RED", 1),
//!     EnumValueDescriptor::new("BLUE", 2),
//! ]));
//! pool.add_message(MessageDescriptor::new("shop.Item", vec![
//!     FieldDescriptor::scalar("shop.Item", "id", 1, Label::Required, FieldType::Int32),
//!     FieldDescriptor::reference("shop.Item", "color", 2, Label::Optional, FieldType::Enum, "shop.Color"),
//! ]));
//!
//! let item = pool.find_message_type_by_name("shop.Item").unwrap();
//! assert_eq!(item.find_field_by_number(2).unwrap().name, "color");
//! assert_eq!(pool.find_enum_type_by_name("shop.Color").unwrap().values.len(), 2);
//! ```

pub mod descriptor;
pub mod file;
pub mod pool;

pub use descriptor::*;
pub use file::*;
pub use pool::*;
