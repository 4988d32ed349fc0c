use crate::dsl::NodeType;

/// Which node types a given source type is normally connected to. An empty
/// list means "anything goes" and never produces a warning.
pub fn allowed_targets(source: NodeType) -> &'static [NodeType] {
    use NodeType::*;
    match source {
        FrontendScaffold => &[WalletAuth, Analytics, IpfsStorage],
        Erc20Token => &[FrontendScaffold, BackendApi, WalletAuth],
        Erc1155Token => &[FrontendScaffold, BackendApi, WalletAuth, IpfsStorage],
        BackendApi => &[FrontendScaffold, IpfsStorage, Analytics],
        IpfsStorage => &[BackendApi, FrontendScaffold],
        WalletAuth => &[],
        Analytics => &[],
    }
}

pub fn is_plausible(source: NodeType, target: NodeType) -> bool {
    let allowed = allowed_targets(source);
    allowed.is_empty() || allowed.contains(&target)
}
