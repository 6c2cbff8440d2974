//! Template document model and builder
//!
//! A template is built by declaring parameters, outputs and resources on a
//! [`TemplateBuilder`], then calling [`TemplateBuilder::finalize`], which
//! checks that every reference resolves and returns an immutable
//! [`Template`].
//!
//! # Example
//!
//! ```rust
//! use cfn_stack::template::{Expr, Output, Parameter, Resource, TemplateBuilder};
//!
//! let mut builder = TemplateBuilder::new();
//! builder.declare_parameter("ClusterName", Parameter::string().with_default("GoCD")).unwrap();
//! builder
//!     .declare_resource(
//!         "Cluster",
//!         Resource::new("AWS::ECS::Cluster").with_property("ClusterName", Expr::reference("ClusterName")),
//!     )
//!     .unwrap();
//! builder.declare_output("ClusterArn", Output::new(Expr::get_att("Cluster", "Arn"))).unwrap();
//!
//! let template = builder.finalize().unwrap();
//! assert_eq!(template.resources().len(), 1);
//! ```

mod builder;
mod document;
mod expr;
pub mod sub;

pub use builder::{TemplateBuilder, PSEUDO_PARAMETERS};
pub use document::{
    Export, Output, Parameter, ParameterType, Resource, Template, DEFAULT_FORMAT_VERSION,
    USE_PREVIOUS_VALUE,
};
pub use expr::{Expr, ExprError, Reference};
