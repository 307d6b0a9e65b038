//! Macros to reduce boilerplate in layer implementations

/// Implements the [`LayerTrait`](crate::layers::base::LayerTrait) accessors
/// backed by a `LayerProperties` field: id, layer_type, z_index and `Any`
/// casts.
///
/// Usage:
/// ```ignore
/// impl LayerTrait for MyLayer {
///     impl_layer_trait!(MyLayer, properties);
/// }
/// ```
#[macro_export]
macro_rules! impl_layer_trait {
    ($layer_type:ty, $properties_field:ident) => {
        fn id(&self) -> &str {
            &self.$properties_field.id
        }

        fn layer_type(&self) -> $crate::layers::base::LayerType {
            self.$properties_field.layer_type
        }

        fn z_index(&self) -> i32 {
            self.$properties_field.z_index
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}
