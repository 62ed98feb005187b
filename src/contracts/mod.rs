// Runtime is hand-assembled, see `contracts/Matchers.evm`. `contracts/Matchers.sol`
// is the equivalent Solidity source.
alloy::sol!(
    #[sol(
        rpc,
        bytecode = "0x608880600b6000396000f360003560e01c806374afd45214610041578063e8a09e1c146100435780636f1fdc3114610048578063b6bbe06114610061578063bad92aa91461007757600080fd5b005b600080fd5b6308c379a060e01b600052600436036004600437366000fd5b634e487b7160e01b600052600160045260246000fd5b630bd3d39c60e01b60005260046000fd",
        deployed_bytecode = "0x60003560e01c806374afd45214610041578063e8a09e1c146100435780636f1fdc3114610048578063b6bbe06114610061578063bad92aa91461007757600080fd5b005b600080fd5b6308c379a060e01b600052600436036004600437366000fd5b634e487b7160e01b600052600160045260246000fd5b630bd3d39c60e01b60005260046000fd"
    )]
    #[derive(Debug)]
    contract Matchers {
        error SomeCustomError();

        function succeeds() external;
        function revertsWithoutReasonString() external;
        function revertsWith(string reason) external;
        function panicAssert() external;
        function revertWithSomeCustomError() external;
    }
);
