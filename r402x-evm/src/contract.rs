//! Solidity interface definitions for on-chain interactions.
//!
//! Contains the minimal ABI surface needed by a settlement client:
//! - [`ISettlementRouter`] - commitment derivation and atomic settlement
//! - [`IEIP3009`] - ERC-3009 + ERC-20 subset for USDC-style tokens
//! - [`IRewardHook`] / [`INftMintHook`] - events emitted by the built-in hooks
//! - [`MintConfig`], [`RewardConfig`], [`Split`] - hook data layouts
//! - [`TransferWithAuthorization`] - EIP-712 typed message signed by the payer

use alloy_sol_types::sol;

sol! {
    /// Settlement router: pulls an ERC-3009 authorization and runs a hook in
    /// the same transaction.
    ///
    /// The commitment doubles as the ERC-3009 nonce, binding the signature to
    /// every settlement parameter including the hook and its data.
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface ISettlementRouter {
        function calculateCommitment(
            address token,
            address from,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 salt,
            address payTo,
            uint256 facilitatorFee,
            address hook,
            bytes hookData
        ) external view returns (bytes32);

        function settleAndExecute(
            address token,
            address from,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 nonce,
            bytes signature,
            bytes32 salt,
            address payTo,
            uint256 facilitatorFee,
            address hook,
            bytes hookData
        ) external;

        function isSettled(bytes32 contextKey) external view returns (bool);

        event Settled(
            bytes32 indexed contextKey,
            address indexed payer,
            address indexed token,
            uint256 amount,
            address hook,
            bytes32 salt,
            address payTo,
            uint256 facilitatorFee
        );

        error AlreadySettled(bytes32 contextKey);
        error InvalidCommitment(bytes32 expected, bytes32 actual);
        error HookExecutionFailed(address hook, bytes reason);
    }
}

sol! {
    /// Minimal ERC-3009 + ERC-20 interface for USDC-style tokens.
    ///
    /// Reference: <https://eips.ethereum.org/EIPS/eip-3009>
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IEIP3009 {
        function name() external view returns (string);
        function version() external view returns (string);
        function balanceOf(address account) external view returns (uint256);
        function authorizationState(address authorizer, bytes32 nonce) external view returns (bool);
    }
}

sol! {
    /// Events emitted by the reward-points hook.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IRewardHook {
        event RewardsDistributed(address indexed recipient, address indexed rewardToken, uint256 points);
    }
}

sol! {
    /// Events emitted by the NFT-mint hook.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface INftMintHook {
        event NftMinted(address indexed recipient, address indexed nftContract, uint256 tokenId);
    }
}

sol! {
    /// Hook data for the NFT-mint hook.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    struct MintConfig {
        address nftContract;
    }

    /// Hook data for the reward-points hook.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    struct RewardConfig {
        address rewardToken;
    }

    /// One entry of the transfer-split hook data array.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    struct Split {
        address recipient;
        uint16 bips;
    }
}

sol! {
    /// Solidity-compatible struct definition for ERC-3009 `transferWithAuthorization`.
    ///
    /// Matches the EIP-3009 format used in EIP-712 typed data. Here `to` is
    /// always the settlement router and `nonce` is the settlement commitment.
    #[allow(missing_docs)]
    #[derive(Debug)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}
