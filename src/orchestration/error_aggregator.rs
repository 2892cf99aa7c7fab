//! # Render Error Aggregation
//!
//! Template rendering fans out across worker threads, and every failure must
//! reach the user in one report. Failures are collected into a tree keyed by
//! instance group and job (or consumed link), then rendered once:
//!
//! ```text
//! Unable to render instance groups for deployment. Errors are:
//!   - Unable to render jobs for instance group 'web'. Errors are:
//!     - Unable to render templates for job 'nginx'. Errors are:
//!       - Failed to find variable '/director/simple/cert' from config server: HTTP code '404'
//! ```
//!
//! Branch order is the order branches were first declared or recorded, never
//! the order failures happened to arrive in. Branches without leaves are not
//! rendered.

use crate::error::DirectorError;

const INDENT: &str = "  ";

/// A node of the rendered error report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorNode {
    Deployment {
        children: Vec<ErrorNode>,
    },
    InstanceGroup {
        name: String,
        children: Vec<ErrorNode>,
    },
    Job {
        name: String,
        children: Vec<ErrorNode>,
    },
    Link {
        job: String,
        name: String,
        provider_deployment: String,
        children: Vec<ErrorNode>,
    },
    Leaf {
        message: String,
    },
}

impl ErrorNode {
    fn header(&self) -> String {
        match self {
            Self::Deployment { .. } => {
                "Unable to render instance groups for deployment. Errors are:".to_string()
            }
            Self::InstanceGroup { name, .. } => {
                format!("Unable to render jobs for instance group '{name}'. Errors are:")
            }
            Self::Job { name, .. } => {
                format!("Unable to render templates for job '{name}'. Errors are:")
            }
            Self::Link {
                name,
                provider_deployment,
                ..
            } => format!(
                "Unable to interpolate link '{name}' properties; provided by '{provider_deployment}' deployment. Errors are:"
            ),
            Self::Leaf { message } => message.clone(),
        }
    }

    fn children(&self) -> &[ErrorNode] {
        match self {
            Self::Deployment { children }
            | Self::InstanceGroup { children, .. }
            | Self::Job { children, .. }
            | Self::Link { children, .. } => children,
            Self::Leaf { .. } => &[],
        }
    }

    /// Whether the subtree holds at least one leaf
    pub fn has_failures(&self) -> bool {
        match self {
            Self::Leaf { .. } => true,
            _ => self.children().iter().any(ErrorNode::has_failures),
        }
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        if !self.has_failures() {
            return;
        }
        if depth == 0 {
            lines.push(self.header());
        } else {
            lines.push(format!("{}- {}", INDENT.repeat(depth), self.header()));
        }
        for child in self.children() {
            child.render_into(depth + 1, lines);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Branch {
    Job {
        name: String,
        leaves: Vec<String>,
    },
    Link {
        job: String,
        name: String,
        provider_deployment: String,
        leaves: Vec<String>,
    },
}

impl Branch {
    fn leaves_mut(&mut self) -> &mut Vec<String> {
        match self {
            Self::Job { leaves, .. } | Self::Link { leaves, .. } => leaves,
        }
    }

    fn to_node(&self) -> ErrorNode {
        let leaves = |messages: &[String]| {
            messages
                .iter()
                .map(|message| ErrorNode::Leaf {
                    message: message.clone(),
                })
                .collect()
        };
        match self {
            Self::Job { name, leaves: messages } => ErrorNode::Job {
                name: name.clone(),
                children: leaves(messages),
            },
            Self::Link {
                job,
                name,
                provider_deployment,
                leaves: messages,
            } => ErrorNode::Link {
                job: job.clone(),
                name: name.clone(),
                provider_deployment: provider_deployment.clone(),
                children: leaves(messages),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupBranch {
    name: String,
    branches: Vec<Branch>,
}

/// Collects rendering failures for one orchestration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorAggregator {
    groups: Vec<GroupBranch>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the position of a job branch without recording a failure
    pub fn declare_job(&mut self, instance_group: &str, job: &str) {
        self.job_leaves(instance_group, job);
    }

    /// Reserve the position of a link branch without recording a failure
    pub fn declare_link(
        &mut self,
        instance_group: &str,
        job: &str,
        link: &str,
        provider_deployment: &str,
    ) {
        self.link_leaves(instance_group, job, link, provider_deployment);
    }

    pub fn record_job_failure(&mut self, instance_group: &str, job: &str, message: impl Into<String>) {
        self.job_leaves(instance_group, job).push(message.into());
    }

    pub fn record_link_failure(
        &mut self,
        instance_group: &str,
        job: &str,
        link: &str,
        provider_deployment: &str,
        message: impl Into<String>,
    ) {
        self.link_leaves(instance_group, job, link, provider_deployment)
            .push(message.into());
    }

    pub fn has_failures(&self) -> bool {
        self.groups
            .iter()
            .flat_map(|group| group.branches.iter())
            .any(|branch| match branch {
                Branch::Job { leaves, .. } | Branch::Link { leaves, .. } => !leaves.is_empty(),
            })
    }

    /// The collected failures as an error tree rooted at the deployment
    pub fn tree(&self) -> ErrorNode {
        ErrorNode::Deployment {
            children: self
                .groups
                .iter()
                .map(|group| ErrorNode::InstanceGroup {
                    name: group.name.clone(),
                    children: group.branches.iter().map(Branch::to_node).collect(),
                })
                .collect(),
        }
    }

    /// Render the report; empty when nothing failed
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        self.tree().render_into(0, &mut lines);
        lines.join("\n")
    }

    /// The single error raised for all collected failures, if any
    pub fn into_error(self) -> Option<DirectorError> {
        self.has_failures()
            .then(|| DirectorError::RenderAggregate(self.render()))
    }

    fn group_branches(&mut self, instance_group: &str) -> &mut Vec<Branch> {
        let index = match self
            .groups
            .iter()
            .position(|group| group.name == instance_group)
        {
            Some(index) => index,
            None => {
                self.groups.push(GroupBranch {
                    name: instance_group.to_string(),
                    branches: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index].branches
    }

    fn job_leaves(&mut self, instance_group: &str, job: &str) -> &mut Vec<String> {
        let branches = self.group_branches(instance_group);
        let index = match branches
            .iter()
            .position(|branch| matches!(branch, Branch::Job { name, .. } if name == job))
        {
            Some(index) => index,
            None => {
                branches.push(Branch::Job {
                    name: job.to_string(),
                    leaves: Vec::new(),
                });
                branches.len() - 1
            }
        };
        branches[index].leaves_mut()
    }

    fn link_leaves(
        &mut self,
        instance_group: &str,
        job: &str,
        link: &str,
        provider_deployment: &str,
    ) -> &mut Vec<String> {
        let branches = self.group_branches(instance_group);
        let index = match branches.iter().position(|branch| {
            matches!(
                branch,
                Branch::Link { job: owner, name, provider_deployment: provider, .. }
                    if owner == job && name == link && provider == provider_deployment
            )
        }) {
            Some(index) => index,
            None => {
                branches.push(Branch::Link {
                    job: job.to_string(),
                    name: link.to_string(),
                    provider_deployment: provider_deployment.to_string(),
                    leaves: Vec::new(),
                });
                branches.len() - 1
            }
        };
        branches[index].leaves_mut()
    }
}
