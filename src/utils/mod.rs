pub mod binary_resolver;
