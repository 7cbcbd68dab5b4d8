//! Solidity ABI surface of the contracts this client encodes calls for.

use alloy_sol_types::sol;

sol! {
    /// One entry of a Kernel batch.
    struct Execution {
        address to;
        uint256 value;
        bytes data;
    }

    /// Kernel v2 per-selector execution config.
    struct ExecutionDetail {
        uint48 validAfter;
        uint48 validUntil;
        address executor;
        address validator;
    }

    interface IKernel {
        function initialize(address defaultValidator, bytes enableData) external payable;
        function execute(address to, uint256 value, bytes data, uint8 operation) external payable;
        function executeBatch(Execution[] executions) external payable;
        function getExecution(bytes4 sig) external view returns (ExecutionDetail detail);
        function isValidSignature(bytes32 hash, bytes signature)
            external
            view
            returns (bytes4 magic);
    }

    interface IKernelFactory {
        function createAccount(address implementation, bytes data, uint256 index)
            external
            payable
            returns (address proxy);
    }

    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }

    /// Policy module plus the bytes it is installed with.
    struct PolicyConfig {
        address policy;
        bytes initData;
    }

    /// Modular permission validator enable payload; `permissionId = keccak256(abi.encode(this))`.
    struct PermissionEnable {
        uint48 validAfter;
        uint48 validUntil;
        address signer;
        bytes signerData;
        PolicyConfig[] policies;
    }

    struct ParamRule {
        uint8 condition;
        uint64 offset;
        bytes32 value;
    }

    /// Merkle policy leaf payload.
    struct Permission {
        address target;
        bytes4 selector;
        uint256 valueLimit;
        ParamRule[] rules;
    }

    /// Per-call inclusion proof carried in the merkle policy's signature slice.
    struct CallProof {
        uint256 index;
        Permission permission;
        bytes32[] proof;
    }

    struct WebAuthnSignature {
        bytes authenticatorData;
        string clientDataJSON;
        uint256 challengeLocation;
        uint256 responseTypeLocation;
        uint256 r;
        uint256 s;
        bool usePrecompiled;
    }

    struct Order {
        uint8 action;
        uint256 marketId;
        int256 amount;
        uint256 price;
        uint256 expiry;
        uint8 tradeType;
        address owner;
        uint256 marginXCD;
        uint256 relayFee;
        bytes32 id;
    }

    struct SignedOrder {
        Order order;
        bytes signature;
    }

    interface IOrderGateway {
        function ORDER_TYPEHASH() external view returns (bytes32 typeHash);
        function eip712Domain()
            external
            view
            returns (
                bytes1 fields,
                string name,
                string version,
                uint256 chainId,
                address verifyingContract,
                bytes32 salt,
                uint256[] extensions
            );
        function getOrderHash(Order order) external view returns (bytes32 orderHash);
        function verifyOrderSignature(SignedOrder signedOrder) external returns (bool valid);
        function cancelOrder(SignedOrder signedOrder) external;
    }

    interface IUniversalSigValidator {
        function isValidSig(address signer, bytes32 hash, bytes signature)
            external
            returns (bool valid);
    }

    /// Requestor contract that forwards to the account's ERC-1271 `isValidSignature`.
    interface ISignatureRequestor {
        function verifySignature(address signer, bytes32 hash, bytes signature)
            external
            view
            returns (bool valid);
    }
}

impl From<&kernel_session_types::Order> for Order {
    fn from(order: &kernel_session_types::Order) -> Self {
        Order {
            action: order.action,
            marketId: order.market_id,
            amount: order.amount,
            price: order.price,
            expiry: order.expiry,
            tradeType: order.trade_type,
            owner: order.owner,
            marginXCD: order.margin_xcd,
            relayFee: order.relay_fee,
            id: order.id,
        }
    }
}

impl From<&Order> for kernel_session_types::Order {
    fn from(order: &Order) -> Self {
        kernel_session_types::Order {
            action: order.action,
            market_id: order.marketId,
            amount: order.amount,
            price: order.price,
            expiry: order.expiry,
            trade_type: order.tradeType,
            owner: order.owner,
            margin_xcd: order.marginXCD,
            relay_fee: order.relayFee,
            id: order.id,
        }
    }
}

impl From<&kernel_session_types::SignedOrder> for SignedOrder {
    fn from(signed: &kernel_session_types::SignedOrder) -> Self {
        SignedOrder {
            order: (&signed.order).into(),
            signature: signed.signature.clone(),
        }
    }
}
