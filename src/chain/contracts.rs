//! Solidity bindings for the contracts the tracker reads.

use alloy::sol;

sol! {
    /// Daily spin contract.
    #[sol(rpc)]
    interface IMedalSpin {
        struct SpinInfo {
            bytes32 hash;
            uint256 timestamp;
        }

        function getSpins(address collector) external view returns (SpinInfo[] memory);
        function canSpin(address collector) external view returns (bool);
    }

    /// Stack NFT holding each collector's medals.
    #[sol(rpc)]
    interface IStack {
        struct ShapeMedalSchema {
            address stackOwner;
            uint256 stackId;
            bytes32 medalUID;
            uint16 medalTier;
            bytes medalData;
            uint256 timestamp;
        }

        function addressToTokenId(address owner) external view returns (uint256);
        function getStackMedals(uint256 stackId) external view returns (ShapeMedalSchema[] memory);
    }

    /// Black Medal raffle.
    #[sol(rpc)]
    interface IBlackMedalRaffle {
        function isParticipantInCurrentRaffle(address participant) external view returns (bool);
        function getCurrentRaffleList() external view returns (address[] memory);
        function getCurrentRaffleRound() external view returns (uint256);
        function getMinimumStreakLength() external view returns (uint256);
        function getWinnerForRound(uint256 round) external view returns (address);
        function isFrozen() external view returns (bool);
    }

    /// ENS registry on Ethereum mainnet.
    #[sol(rpc)]
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    /// ENS public resolver.
    #[sol(rpc)]
    interface IEnsResolver {
        function addr(bytes32 node) external view returns (address);
        function name(bytes32 node) external view returns (string memory);
    }
}
