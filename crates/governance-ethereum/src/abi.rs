use alloy::sol;

// Governor events, OpenZeppelin Governor signatures
sol! {
    #[sol(rpc)]
    interface IGovernor {
        event ProposalCreated(
            uint256 proposalId,
            address proposer,
            address[] targets,
            uint256[] values,
            string[] signatures,
            bytes[] calldatas,
            uint256 voteStart,
            uint256 voteEnd,
            string description
        );

        event VoteCast(
            address indexed voter,
            uint256 proposalId,
            uint8 support,
            uint256 weight,
            string reason
        );
    }
}
