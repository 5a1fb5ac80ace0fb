/// Remote fleet-management endpoints consumed by the CPI.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetEndpoint<'a> {
    Nodes,
    Node(&'a str),
    NodeCatalog(&'a str),
    NodeTags(&'a str),
    NodeTag(&'a str, &'a str),
    NodesByTag(&'a str),
    NodeWorkflows(&'a str),
    NodeActiveWorkflows(&'a str),
    NodeWorkflowAction(&'a str),
    Workflow(&'a str),
    Tasks,
    Task(&'a str),
    Graphs,
    Graph(&'a str),
    File(&'a str),
}

impl FleetEndpoint<'_> {
    pub fn path(&self) -> String {
        match self {
            Self::Nodes => "/nodes".to_string(),
            Self::Node(id) => format!("/nodes/{}", id),
            Self::NodeCatalog(id) => format!("/nodes/{}/catalogs/ohai", id),
            Self::NodeTags(id) => format!("/nodes/{}/tags", id),
            Self::NodeTag(id, tag) => format!("/nodes/{}/tags/{}", id, tag),
            Self::NodesByTag(tag) => format!("/tags/{}/nodes", tag),
            Self::NodeWorkflows(id) => format!("/nodes/{}/workflows", id),
            Self::NodeActiveWorkflows(id) => format!("/nodes/{}/workflows?active=true", id),
            Self::NodeWorkflowAction(id) => format!("/nodes/{}/workflows/action", id),
            Self::Workflow(instance_id) => format!("/workflows/{}", instance_id),
            Self::Tasks => "/workflows/tasks".to_string(),
            Self::Task(name) => format!("/workflows/tasks/{}", name),
            Self::Graphs => "/workflows/graphs".to_string(),
            Self::Graph(name) => format!("/workflows/graphs/{}", name),
            Self::File(name) => format!("/files/{}", name),
        }
    }

    pub fn url(&self, api_url: &str) -> String {
        format!("{}{}", api_url.trim_end_matches('/'), self.path())
    }
}
