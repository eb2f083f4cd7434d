//! Terminal report of a resolved robot.

use colored::Colorize;
use mateforge_kinematics::{ResolvedRobot, TreeNode};
use mateforge_types::JointType;

/// Lines of the tree view, trunk first.
pub fn render_tree(robot: &ResolvedRobot) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}",
        "●".green(),
        robot.link_name(&robot.tree.id).bold()
    )];
    render_children(robot, &robot.tree, "", &mut lines);
    lines
}

fn render_children(robot: &ResolvedRobot, node: &TreeNode, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└─" } else { "├─" };
        let joint = match &child.joint {
            Some(joint) => {
                let kind = match joint.joint_type {
                    JointType::Revolute => joint.joint_type.to_string().cyan(),
                    JointType::Prismatic => joint.joint_type.to_string().magenta(),
                    JointType::Fixed => joint.joint_type.to_string().dimmed(),
                };
                let range = joint
                    .limits
                    .map(|l| format!(" [{:.3}, {:.3}]", l.lower, l.upper))
                    .unwrap_or_default();
                let inverted = if joint.inverted { " (inverted)" } else { "" };
                format!("{} {}{}{} ", joint.name.yellow(), kind, range, inverted)
            }
            None => String::new(),
        };
        lines.push(format!(
            "{prefix}{branch} {joint}→ {}",
            robot.link_name(&child.id).bold()
        ));
        let next = format!("{prefix}{}", if last { "   " } else { "│  " });
        render_children(robot, child, &next, lines);
    }
}

/// Print the tree and a one-line summary.
pub fn print(robot: &ResolvedRobot) {
    println!();
    for line in render_tree(robot) {
        println!("  {line}");
    }
    println!();
    let joints: Vec<_> = robot.tree.iter().filter_map(|n| n.joint.as_ref()).collect();
    println!(
        "  {} link(s), {} joint(s) ({} movable), {} frame(s), {} occurrence(s)",
        robot.tree.node_count(),
        joints.len(),
        joints.iter().filter(|j| j.is_movable()).count(),
        robot.frames.len(),
        robot.occurrences.len()
    );
    if !robot.unresolved.is_empty() {
        println!(
            "  {}",
            format!("{} occurrence(s) could not be resolved", robot.unresolved.len()).yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mateforge_kinematics::{NoLimits, ResolveOptions, resolve};
    use mateforge_types::api::AssemblyDefinition;
    use serde_json::json;

    fn robot() -> ResolvedRobot {
        let identity = [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ];
        let cs = json!({
            "xAxis": [1.0, 0.0, 0.0], "yAxis": [0.0, 1.0, 0.0],
            "zAxis": [0.0, 0.0, 1.0], "origin": [0.0, 0.0, 0.0]
        });
        let dof = |name: &str, child: &str, parent: &str| {
            json!({
                "id": name, "featureType": "mate",
                "featureData": {
                    "name": name, "mateType": "REVOLUTE",
                    "matedEntities": [
                        { "matedOccurrence": [child], "matedCS": cs },
                        { "matedOccurrence": [parent], "matedCS": cs }
                    ]
                }
            })
        };
        let assembly: AssemblyDefinition = serde_json::from_value(json!({
            "rootAssembly": {
                "instances": [
                    { "id": "A", "name": "base", "type": "Part" },
                    { "id": "B", "name": "arm", "type": "Part" },
                    { "id": "C", "name": "wheel", "type": "Part" }
                ],
                "occurrences": [
                    { "path": ["A"], "transform": identity, "fixed": true },
                    { "path": ["B"], "transform": identity },
                    { "path": ["C"], "transform": identity }
                ],
                "features": [ dof("dof_shoulder", "B", "A"), dof("dof_axle_inv", "C", "A") ]
            }
        }))
        .unwrap();
        resolve(&assembly, None, &NoLimits, ResolveOptions::default()).unwrap()
    }

    #[test]
    fn tree_lines_show_joints_and_links() {
        colored::control::set_override(false);
        let lines = render_tree(&robot());
        assert_eq!(
            lines,
            vec![
                "● base".to_string(),
                "├─ shoulder revolute → arm".to_string(),
                "└─ axle revolute (inverted) → wheel".to_string(),
            ]
        );
    }
}
