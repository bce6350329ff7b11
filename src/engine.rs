//! The measurement engine contract, and a simple stacking engine implementing it.
//!
//! The core never positions nodes itself. A [`LayoutEngine`] receives a resolved [`NodeTree`],
//! writes each node's bounds (relative to its parent) with [`NodeTree::set_bounds`], and asks a
//! [`LeafMeasurer`] for the size of every measurable node it encounters.

use crate::error::Result;
use crate::node::FlexDirection;
use crate::rect::{Edges, Rect};
use crate::size_spec::{Size, SizeSpec, SpecMode};
use crate::tree::{NodeId, NodeTree};
use cgmath::{Point2, Vector2};

/// Measures leaves on behalf of a layout engine.
///
/// Leaves are nodes whose component measures its own content, and nested tree holders.
pub trait LeafMeasurer {
    fn measure(
        &mut self,
        tree: &mut NodeTree,
        node: NodeId,
        width: SizeSpec,
        height: SizeSpec,
    ) -> Result<Size>;
}

/// Computes positions and sizes for a node tree.
pub trait LayoutEngine: Send + Sync {
    /// Lays out the subtree at `root` and returns its size. The root is placed at the origin.
    fn calculate_layout(
        &self,
        tree: &mut NodeTree,
        root: NodeId,
        width: SizeSpec,
        height: SizeSpec,
        measurer: &mut dyn LeafMeasurer,
    ) -> Result<Size>;
}

/// Stacks children along the main axis of their container.
///
/// Supports fixed and percentage sizes, padding, margins, `flex_grow` on the main axis,
/// stretching on the cross axis and absolutely positioned children. Anything fancier belongs in
/// a real box-layout engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackLayoutEngine;

fn main_axis(direction: FlexDirection, size: Size) -> i32 {
    match direction {
        FlexDirection::Column => size.y,
        FlexDirection::Row => size.x,
    }
}

fn cross_axis(direction: FlexDirection, size: Size) -> i32 {
    match direction {
        FlexDirection::Column => size.x,
        FlexDirection::Row => size.y,
    }
}

fn from_axes(direction: FlexDirection, main: i32, cross: i32) -> Vector2<i32> {
    match direction {
        FlexDirection::Column => Vector2::new(cross, main),
        FlexDirection::Row => Vector2::new(main, cross),
    }
}

/// Start and end margins along the main and cross axes.
fn margin_axes(direction: FlexDirection, margin: Edges) -> ((i32, i32), (i32, i32)) {
    match direction {
        FlexDirection::Column => ((margin.top, margin.bottom), (margin.left, margin.right)),
        FlexDirection::Row => ((margin.left, margin.right), (margin.top, margin.bottom)),
    }
}

/// Applies a node's own size properties to the space offered by its parent.
fn own_spec(fixed: Option<i32>, percent: Option<f32>, available: SizeSpec) -> SizeSpec {
    if let Some(size) = fixed {
        return SizeSpec::exactly(size);
    }
    match (percent, available.mode) {
        (Some(percent), SpecMode::Exactly) | (Some(percent), SpecMode::AtMost) => {
            SizeSpec::exactly((available.size as f32 * percent / 100.) as i32)
        }
        _ => available,
    }
}

fn bounded(spec: SizeSpec) -> SizeSpec {
    match spec.mode {
        SpecMode::Exactly => SizeSpec::at_most(spec.size),
        _ => spec,
    }
}

impl StackLayoutEngine {
    /// Measures a node given the space its parent offers (margins already removed) and lays out
    /// its children. Returns the node's size.
    fn measure(
        &self,
        tree: &mut NodeTree,
        id: NodeId,
        available_width: SizeSpec,
        available_height: SizeSpec,
        measurer: &mut dyn LeafMeasurer,
    ) -> Result<Size> {
        let node = tree.node(id)?;
        let style = node.style.clone();
        let measurable = node.is_measurable();
        let children = node.children.clone();

        let width_spec = own_spec(style.width, style.width_percent, available_width);
        let height_spec = own_spec(style.height, style.height_percent, available_height);

        if measurable {
            let size = measurer.measure(tree, id, width_spec, height_spec)?;
            let size = Size::new(width_spec.resolve(size.x), height_spec.resolve(size.y));
            let origin = tree.node(id)?.bounds.origin;
            tree.set_bounds(id, Rect::new(origin, size))?;
            return Ok(size);
        }

        let direction = style.direction;
        let padding = style.padding;
        let inner_width = width_spec.shrink(padding.horizontal());
        let inner_height = height_spec.shrink(padding.vertical());
        let inner_main = match direction {
            FlexDirection::Column => inner_height,
            FlexDirection::Row => inner_width,
        };
        let inner_cross = match direction {
            FlexDirection::Column => inner_width,
            FlexDirection::Row => inner_height,
        };

        let mut in_flow = Vec::with_capacity(children.len());
        let mut used_main = 0;
        let mut max_cross = 0;
        let mut total_grow = 0.;

        for child in &children {
            let child_style = tree.style(*child)?.clone();
            let ((main_start, main_end), (cross_start, cross_end)) =
                margin_axes(direction, child_style.margin);

            if let Some(position) = child_style.position {
                let width = bounded(inner_width).shrink(child_style.margin.horizontal());
                let height = bounded(inner_height).shrink(child_style.margin.vertical());
                self.measure(tree, *child, width, height, measurer)?;
                let size = tree.node(*child)?.bounds.size;
                let origin = Point2::new(
                    padding.left + child_style.margin.left + position.x,
                    padding.top + child_style.margin.top + position.y,
                );
                tree.set_bounds(*child, Rect::new(origin, size))?;
                continue;
            }

            let main_margins = main_start + main_end;
            let cross_margins = cross_start + cross_end;
            let child_main = match inner_main.mode {
                SpecMode::Unspecified => SizeSpec::unspecified(),
                _ => SizeSpec::at_most((inner_main.size - used_main - main_margins).max(0)),
            };
            let child_cross = inner_cross.shrink(cross_margins);
            let (width, height) = match direction {
                FlexDirection::Column => (child_cross, child_main),
                FlexDirection::Row => (child_main, child_cross),
            };
            let size = self.measure(tree, *child, width, height, measurer)?;
            used_main += main_axis(direction, size) + main_margins;
            max_cross = max_cross.max(cross_axis(direction, size) + cross_margins);
            total_grow += child_style.flex_grow;
            in_flow.push((*child, child_style));
        }

        let free = match inner_main.mode {
            SpecMode::Exactly => inner_main.size - used_main,
            _ => 0,
        };
        if free > 0 && total_grow > 0. {
            for (child, child_style) in &in_flow {
                if child_style.flex_grow <= 0. {
                    continue;
                }
                let extra = (free as f32 * child_style.flex_grow / total_grow) as i32;
                let current = tree.node(*child)?.bounds.size;
                let ((_, _), (cross_start, cross_end)) = margin_axes(direction, child_style.margin);
                let main = SizeSpec::exactly(main_axis(direction, current) + extra);
                let cross = inner_cross.shrink(cross_start + cross_end);
                let (width, height) = match direction {
                    FlexDirection::Column => (cross, main),
                    FlexDirection::Row => (main, cross),
                };
                let size = self.measure(tree, *child, width, height, measurer)?;
                used_main += main_axis(direction, size) - main_axis(direction, current);
            }
        }

        let mut offset = 0;
        for (child, child_style) in &in_flow {
            let ((main_start, main_end), (cross_start, _)) =
                margin_axes(direction, child_style.margin);
            let size = tree.node(*child)?.bounds.size;
            let position = from_axes(direction, offset + main_start, cross_start);
            let origin = Point2::new(padding.left + position.x, padding.top + position.y);
            tree.set_bounds(*child, Rect::new(origin, size))?;
            offset += main_start + main_axis(direction, size) + main_end;
        }

        let content = from_axes(direction, used_main, max_cross);
        let size = Size::new(
            width_spec.resolve(content.x + padding.horizontal()),
            height_spec.resolve(content.y + padding.vertical()),
        );
        let origin = tree.node(id)?.bounds.origin;
        tree.set_bounds(id, Rect::new(origin, size))?;
        Ok(size)
    }
}

impl LayoutEngine for StackLayoutEngine {
    fn calculate_layout(
        &self,
        tree: &mut NodeTree,
        root: NodeId,
        width: SizeSpec,
        height: SizeSpec,
        measurer: &mut dyn LeafMeasurer,
    ) -> Result<Size> {
        tree.set_bounds(root, Rect::zero())?;
        let size = self.measure(tree, root, width, height, measurer)?;
        tree.set_bounds(root, Rect::new(Point2::new(0, 0), size))?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Style;
    use crate::pools::Pools;
    use crate::tree::MeasureKind;
    use std::sync::Arc;

    /// Every measurable leaf is 5x5.
    struct FixedLeaves(usize);

    impl LeafMeasurer for FixedLeaves {
        fn measure(
            &mut self,
            _: &mut NodeTree,
            _: NodeId,
            _: SizeSpec,
            _: SizeSpec,
        ) -> Result<Size> {
            self.0 += 1;
            Ok(Size::new(5, 5))
        }
    }

    fn add(
        tree: &mut NodeTree,
        parent: Option<NodeId>,
        style: Style,
        measure: MeasureKind,
    ) -> NodeId {
        let id = tree.create_node();
        {
            let node = tree.node_mut(id).unwrap();
            node.style = style;
            node.measure = measure;
        }
        match parent {
            Some(parent) => tree.append_child(parent, id).unwrap(),
            None => tree.set_root(id),
        }
        id
    }

    #[test]
    fn column_stacks_children() {
        let mut tree = NodeTree::new(Arc::new(Pools::new()), 8);
        let root = add(
            &mut tree,
            None,
            Style {
                padding: Edges::all(2),
                ..Style::default()
            },
            MeasureKind::None,
        );
        let fixed = add(
            &mut tree,
            Some(root),
            Style {
                height: Some(10),
                margin: Edges::new(0, 1, 0, 1),
                ..Style::default()
            },
            MeasureKind::None,
        );
        let leaf = add(&mut tree, Some(root), Style::default(), MeasureKind::Component);

        let mut leaves = FixedLeaves(0);
        let size = StackLayoutEngine
            .calculate_layout(
                &mut tree,
                root,
                SizeSpec::exactly(20),
                SizeSpec::unspecified(),
                &mut leaves,
            )
            .unwrap();
        assert_eq!(leaves.0, 1);
        assert_eq!(size, Size::new(20, 2 + 1 + 10 + 1 + 5 + 2));
        // both stretch across the column
        assert_eq!(tree.node(fixed).unwrap().bounds(), Rect::from_ltrb(2, 3, 18, 13));
        assert_eq!(tree.node(leaf).unwrap().bounds(), Rect::from_ltrb(2, 14, 18, 19));
    }

    #[test]
    fn flex_grow_fills_the_row() {
        let mut tree = NodeTree::new(Arc::new(Pools::new()), 8);
        let root = add(
            &mut tree,
            None,
            Style {
                direction: FlexDirection::Row,
                ..Style::default()
            },
            MeasureKind::None,
        );
        let a = add(
            &mut tree,
            Some(root),
            Style {
                width: Some(10),
                ..Style::default()
            },
            MeasureKind::None,
        );
        let b = add(
            &mut tree,
            Some(root),
            Style {
                flex_grow: 1.,
                ..Style::default()
            },
            MeasureKind::None,
        );
        let absolute = add(
            &mut tree,
            Some(root),
            Style {
                position: Some(Point2::new(3, 4)),
                width: Some(2),
                height: Some(2),
                ..Style::default()
            },
            MeasureKind::None,
        );

        StackLayoutEngine
            .calculate_layout(
                &mut tree,
                root,
                SizeSpec::exactly(50),
                SizeSpec::exactly(8),
                &mut FixedLeaves(0),
            )
            .unwrap();
        assert_eq!(tree.node(a).unwrap().bounds(), Rect::from_ltrb(0, 0, 10, 8));
        assert_eq!(tree.node(b).unwrap().bounds(), Rect::from_ltrb(10, 0, 50, 8));
        assert_eq!(tree.node(absolute).unwrap().bounds(), Rect::from_ltrb(3, 4, 5, 6));
    }
}
