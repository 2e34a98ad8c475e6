//! Boilerplate shared by the shape-holding layers

/// Implements [`LayerTrait`](crate::layers::base::LayerTrait) for a layer
/// that keeps its settings in a `LayerProperties` field and its shapes in a
/// `Vec` mirrored by an id-to-slot map.
///
/// `clear` empties both collections; the properties are left untouched.
#[macro_export]
macro_rules! impl_layer_trait {
    ($layer:ty, props: $props:ident, shapes: $shapes:ident, index: $index:ident) => {
        impl $crate::layers::base::LayerTrait for $layer {
            fn id(&self) -> &str {
                &self.$props.id
            }

            fn name(&self) -> &str {
                &self.$props.name
            }

            fn layer_type(&self) -> $crate::layers::base::LayerType {
                self.$props.layer_type
            }

            fn z_index(&self) -> i32 {
                self.$props.z_index
            }

            fn is_visible(&self) -> bool {
                self.$props.visible
            }

            fn set_visible(&mut self, visible: bool) {
                self.$props.visible = visible;
            }

            fn len(&self) -> usize {
                self.$shapes.len()
            }

            fn clear(&mut self) {
                self.$shapes.clear();
                self.$index.clear();
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }
    };
}
