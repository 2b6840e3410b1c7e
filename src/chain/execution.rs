//! Contract execution.
//!
//! A [`Tx`] runs against a scratch copy of the chain state. Methods take the
//! caller explicitly so contracts can call into each other (a bridge calling
//! its gateway is seen by the gateway as `msg.sender == bridge`).

use ethereum_types::{Address, H256, U256};

use super::state::*;
use super::ContractEvent;
use crate::abi::Token;
use crate::crypto;
use crate::error::ChainError;

/// Execution context of one transaction.
pub struct Tx<'a> {
    state: &'a mut ChainState,
    sender: Address,
    logs: Vec<(Address, ContractEvent)>,
    deployed: Option<Address>,
}

impl<'a> Tx<'a> {
    pub(crate) fn new(state: &'a mut ChainState, sender: Address) -> Self {
        Self {
            state,
            sender,
            logs: Vec::new(),
            deployed: None,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<(Address, ContractEvent)>, Option<Address>) {
        (self.logs, self.deployed)
    }

    /// Externally owned account that signed the transaction.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Read access to the (uncommitted) state.
    pub fn state(&self) -> &ChainState {
        &*self.state
    }

    fn emit(&mut self, address: Address, event: ContractEvent) {
        self.logs.push((address, event));
    }

    fn create(&mut self, creator: Address, contract: Contract) -> Address {
        self.state.created += 1;
        let hash = crypto::keccak256(crate::abi::encode(&[
            Token::Address(creator),
            Token::Uint(U256::from(self.state.created)),
        ]));
        let address = Address::from_slice(&hash.as_bytes()[12..]);
        self.state.contracts.insert(address, contract);
        address
    }

    /// Deploys `contract` as the transaction's created contract.
    pub fn deploy(&mut self, contract: Contract) -> Address {
        let address = self.create(self.sender, contract);
        self.deployed = Some(address);
        address
    }

    // ========================================================================
    // SIGNATURE VERIFIER
    // ========================================================================

    pub fn verifier_initialize(
        &mut self,
        verifier: Address,
        chain_name: &str,
        mint_authority: Address,
        admin: Address,
    ) -> Result<(), ChainError> {
        let state = self.state.verifier_mut(&verifier)?;
        if state.initialized {
            return Err(ChainError::revert(
                "Initializable: contract is already initialized",
            ));
        }
        state.initialized = true;
        state.chain_name = chain_name.to_string();
        state.mint_authority = mint_authority;
        state.admin = admin;
        Ok(())
    }

    pub fn verifier_update_mint_authority(
        &mut self,
        verifier: Address,
        caller: Address,
        mint_authority: Address,
    ) -> Result<(), ChainError> {
        let state = self.state.verifier_mut(&verifier)?;
        if caller != state.admin {
            return Err(ChainError::revert("RenVMSignatureVerifier: caller is not admin"));
        }
        if mint_authority.is_zero() {
            return Err(ChainError::revert(
                "RenVMSignatureVerifier: mintAuthority cannot be set to address zero",
            ));
        }
        state.mint_authority = mint_authority;
        self.emit(verifier, ContractEvent::LogMintAuthorityUpdated { mint_authority });
        Ok(())
    }

    // ========================================================================
    // PROXY BEACONS
    // ========================================================================

    pub fn beacon_update_proxy_deployer(
        &mut self,
        beacon: Address,
        caller: Address,
        proxy_deployer: Address,
    ) -> Result<(), ChainError> {
        let state = self.state.beacon_mut(&beacon)?;
        if caller != state.owner {
            return Err(ChainError::revert("Ownable: caller is not the owner"));
        }
        if proxy_deployer.is_zero() {
            return Err(ChainError::revert("ProxyBeacon: invalid proxy deployer"));
        }
        state.proxy_deployer = proxy_deployer;
        self.emit(beacon, ContractEvent::ProxyDeployerUpdated { proxy_deployer });
        Ok(())
    }

    fn beacon_deploy_proxy(
        &mut self,
        beacon: Address,
        caller: Address,
        contract: Contract,
    ) -> Result<Address, ChainError> {
        if caller != self.state.beacon(&beacon)?.proxy_deployer {
            return Err(ChainError::revert(
                "ProxyBeacon: caller is not the proxy deployer",
            ));
        }
        let proxy = self.create(beacon, contract);
        self.emit(beacon, ContractEvent::ProxyDeployed { proxy });
        Ok(proxy)
    }

    // ========================================================================
    // GATEWAY REGISTRY
    // ========================================================================

    pub fn registry_initialize(
        &mut self,
        registry: Address,
        init: RegistryInit,
    ) -> Result<(), ChainError> {
        if self.state.registry(&registry)?.init.is_some() {
            return Err(ChainError::revert(
                "Initializable: contract is already initialized",
            ));
        }
        self.state.verifier(&init.signature_verifier)?;
        self.state.contract(&init.transfer_contract)?;
        self.state.beacon(&init.ren_asset_beacon)?;
        self.state.beacon(&init.mint_gateway_beacon)?;
        self.state.beacon(&init.lock_gateway_beacon)?;

        self.state.registry_mut(&registry)?.init = Some(init);
        Ok(())
    }

    fn require_registry_signer(
        &self,
        registry: &Address,
        caller: &Address,
    ) -> Result<RegistryInit, ChainError> {
        let init = self.state.registry_init(registry)?;
        if *caller != init.owner && !init.signers.contains(caller) {
            return Err(ChainError::revert("GatewayRegistry: not signer"));
        }
        Ok(init.clone())
    }

    fn require_new_symbol(&self, registry: &Address, symbol: &str) -> Result<(), ChainError> {
        let state = self.state.registry(registry)?;
        if state.mint_gateways.contains_key(symbol) || state.lock_gateways.contains_key(symbol) {
            return Err(ChainError::revert(format!(
                "GatewayRegistry: {} symbol already added",
                symbol
            )));
        }
        Ok(())
    }

    /// Deploys a RenAsset proxy and its MintGateway proxy for `symbol`.
    #[allow(clippy::too_many_arguments)]
    pub fn registry_deploy_mint_gateway_and_ren_asset(
        &mut self,
        registry: Address,
        caller: Address,
        symbol: &str,
        token_name: &str,
        token_symbol: &str,
        decimals: u8,
        version: &str,
    ) -> Result<GatewayEntry, ChainError> {
        let init = self.require_registry_signer(&registry, &caller)?;
        self.require_new_symbol(&registry, symbol)?;
        let chain_name = self.state.verifier(&init.signature_verifier)?.chain_name.clone();

        let token = self.beacon_deploy_proxy(
            init.ren_asset_beacon,
            registry,
            Contract::Token(TokenState {
                name: token_name.to_string(),
                symbol: token_symbol.to_string(),
                decimals,
                total_supply: U256::zero(),
                balances: Default::default(),
                allowances: Default::default(),
                owner: Some(registry),
                beacon: Some(init.ren_asset_beacon),
                version: Some(version.to_string()),
            }),
        )?;
        let gateway = self.beacon_deploy_proxy(
            init.mint_gateway_beacon,
            registry,
            Contract::MintGateway(MintGatewayState {
                asset: symbol.to_string(),
                token,
                signature_verifier: init.signature_verifier,
                selector_hash: crypto::selector_hash(symbol, &chain_name),
                beacon: init.mint_gateway_beacon,
                version: version.to_string(),
                burn_nonce: 0,
                spent: Default::default(),
            }),
        )?;
        // The gateway becomes the only account able to mint and burn.
        self.state.token_mut(&token)?.owner = Some(gateway);

        let entry = GatewayEntry { gateway, token };
        self.state
            .registry_mut(&registry)?
            .mint_gateways
            .insert(symbol.to_string(), entry);
        self.emit(
            registry,
            ContractEvent::LogMintGatewayCreated {
                symbol: symbol.to_string(),
                token,
                gateway,
            },
        );
        Ok(entry)
    }

    /// Deploys a LockGateway proxy for an existing token.
    pub fn registry_deploy_lock_gateway(
        &mut self,
        registry: Address,
        caller: Address,
        symbol: &str,
        token: Address,
        version: &str,
    ) -> Result<GatewayEntry, ChainError> {
        let init = self.require_registry_signer(&registry, &caller)?;
        self.require_new_symbol(&registry, symbol)?;
        self.state.token(&token)?;
        let chain_name = self.state.verifier(&init.signature_verifier)?.chain_name.clone();

        let gateway = self.beacon_deploy_proxy(
            init.lock_gateway_beacon,
            registry,
            Contract::LockGateway(LockGatewayState {
                asset: symbol.to_string(),
                token,
                signature_verifier: init.signature_verifier,
                selector_hash: crypto::selector_hash(symbol, &chain_name),
                beacon: init.lock_gateway_beacon,
                version: version.to_string(),
                lock_nonce: 0,
                spent: Default::default(),
            }),
        )?;

        let entry = GatewayEntry { gateway, token };
        self.state
            .registry_mut(&registry)?
            .lock_gateways
            .insert(symbol.to_string(), entry);
        self.emit(
            registry,
            ContractEvent::LogLockGatewayCreated {
                symbol: symbol.to_string(),
                token,
                gateway,
            },
        );
        Ok(entry)
    }

    // ========================================================================
    // ERC-20
    // ========================================================================

    pub fn token_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ChainError> {
        if to.is_zero() {
            return Err(ChainError::revert("ERC20: transfer to the zero address"));
        }
        let state = self.state.token_mut(&token)?;
        let from_balance = state.balance_of(&from);
        if from_balance < amount {
            return Err(ChainError::revert("ERC20: transfer amount exceeds balance"));
        }
        state.balances.insert(from, from_balance - amount);
        *state.balances.entry(to).or_default() += amount;
        self.emit(token, ContractEvent::Transfer { from, to, value: amount });
        Ok(())
    }

    pub fn token_approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), ChainError> {
        if spender.is_zero() {
            return Err(ChainError::revert("ERC20: approve to the zero address"));
        }
        self.state
            .token_mut(&token)?
            .allowances
            .insert((owner, spender), amount);
        self.emit(
            token,
            ContractEvent::Approval {
                owner,
                spender,
                value: amount,
            },
        );
        Ok(())
    }

    pub fn token_transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ChainError> {
        let state = self.state.token_mut(&token)?;
        let allowance = state.allowance(&from, &spender);
        if allowance < amount {
            return Err(ChainError::revert("ERC20: insufficient allowance"));
        }
        state.allowances.insert((from, spender), allowance - amount);
        self.token_transfer(token, from, to, amount)
    }

    fn token_mint(
        &mut self,
        token: Address,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ChainError> {
        let state = self.state.token_mut(&token)?;
        if state.owner != Some(caller) {
            return Err(ChainError::revert("Ownable: caller is not the owner"));
        }
        state.total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| ChainError::revert("ERC20: mint amount overflows total supply"))?;
        // Balances never exceed the total supply
        *state.balances.entry(to).or_default() += amount;
        self.emit(
            token,
            ContractEvent::Transfer {
                from: Address::zero(),
                to,
                value: amount,
            },
        );
        Ok(())
    }

    fn token_burn(
        &mut self,
        token: Address,
        caller: Address,
        from: Address,
        amount: U256,
    ) -> Result<(), ChainError> {
        let state = self.state.token_mut(&token)?;
        if state.owner != Some(caller) {
            return Err(ChainError::revert("Ownable: caller is not the owner"));
        }
        let balance = state.balance_of(&from);
        if balance < amount {
            return Err(ChainError::revert("ERC20: burn amount exceeds balance"));
        }
        state.balances.insert(from, balance - amount);
        state.total_supply -= amount;
        self.emit(
            token,
            ContractEvent::Transfer {
                from,
                to: Address::zero(),
                value: amount,
            },
        );
        Ok(())
    }

    // ========================================================================
    // GATEWAYS
    // ========================================================================

    /// Rejects spent or invalid signatures over `sig_hash`.
    fn check_signature(
        &self,
        verifier: &Address,
        spent: &std::collections::HashSet<H256>,
        sig_hash: &H256,
        signature: &[u8],
        contract: &str,
    ) -> Result<(), ChainError> {
        if spent.contains(sig_hash) {
            return Err(ChainError::revert(format!(
                "{}: signature already spent",
                contract
            )));
        }
        if !self.state.is_valid_signature(verifier, sig_hash, signature)? {
            return Err(ChainError::revert(format!("{}: invalid signature", contract)));
        }
        Ok(())
    }

    /// Mints `amount` to `caller` against a mint authority signature.
    pub fn gateway_mint(
        &mut self,
        gateway: Address,
        caller: Address,
        p_hash: H256,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<U256, ChainError> {
        if amount.is_zero() {
            return Err(ChainError::revert("MintGateway: amount must be greater than zero"));
        }
        let state = self.state.mint_gateway(&gateway)?.clone();
        let sig_hash =
            crypto::signature_hash(&p_hash, amount, &state.selector_hash, &caller, &n_hash);
        self.check_signature(
            &state.signature_verifier,
            &state.spent,
            &sig_hash,
            signature,
            "MintGateway",
        )?;
        self.state.mint_gateway_mut(&gateway)?.spent.insert(sig_hash);
        self.token_mint(state.token, gateway, caller, amount)?;
        self.emit(
            gateway,
            ContractEvent::LogMint {
                to: caller,
                amount,
                sig_hash,
                n_hash,
            },
        );
        Ok(amount)
    }

    /// Burns `amount` of the caller's tokens towards `to` on another chain.
    pub fn gateway_burn(
        &mut self,
        gateway: Address,
        caller: Address,
        to: Vec<u8>,
        amount: U256,
    ) -> Result<U256, ChainError> {
        if amount.is_zero() {
            return Err(ChainError::revert("MintGateway: amount must be greater than zero"));
        }
        if to.is_empty() {
            return Err(ChainError::revert("MintGateway: to address is empty"));
        }
        let token = self.state.mint_gateway(&gateway)?.token;
        self.token_burn(token, gateway, caller, amount)?;

        let state = self.state.mint_gateway_mut(&gateway)?;
        let burn_nonce = state.burn_nonce;
        state.burn_nonce += 1;
        self.emit(
            gateway,
            ContractEvent::LogBurn {
                to,
                amount,
                burn_nonce,
            },
        );
        Ok(amount)
    }

    /// Pulls `amount` of the caller's tokens into the gateway.
    pub fn gateway_lock(
        &mut self,
        gateway: Address,
        caller: Address,
        recipient_address: String,
        recipient_chain: String,
        recipient_payload: Vec<u8>,
        amount: U256,
    ) -> Result<U256, ChainError> {
        if amount.is_zero() {
            return Err(ChainError::revert("LockGateway: amount must be greater than zero"));
        }
        let token = self.state.lock_gateway(&gateway)?.token;
        self.token_transfer_from(token, gateway, caller, gateway, amount)?;

        let state = self.state.lock_gateway_mut(&gateway)?;
        let lock_nonce = state.lock_nonce;
        state.lock_nonce += 1;
        self.emit(
            gateway,
            ContractEvent::LogLockToChain {
                recipient_address,
                recipient_chain,
                recipient_payload,
                amount,
                lock_nonce,
            },
        );
        Ok(amount)
    }

    /// Releases locked tokens to `caller` against a mint authority signature.
    pub fn gateway_release(
        &mut self,
        gateway: Address,
        caller: Address,
        p_hash: H256,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<U256, ChainError> {
        let state = self.state.lock_gateway(&gateway)?.clone();
        let sig_hash =
            crypto::signature_hash(&p_hash, amount, &state.selector_hash, &caller, &n_hash);
        self.check_signature(
            &state.signature_verifier,
            &state.spent,
            &sig_hash,
            signature,
            "LockGateway",
        )?;
        self.state.lock_gateway_mut(&gateway)?.spent.insert(sig_hash);
        self.token_transfer(state.token, gateway, caller, amount)?;
        self.emit(
            gateway,
            ContractEvent::LogRelease {
                recipient: caller,
                amount,
                sig_hash,
                n_hash,
            },
        );
        Ok(amount)
    }

    // ========================================================================
    // BRIDGE CONTRACTS
    // ========================================================================

    fn mint_gateway_of(&self, bridge: &Address, symbol: &str) -> Result<GatewayEntry, ChainError> {
        let registry = self.state.wired_registry(bridge)?;
        self.state
            .mint_gateway_by_symbol(&registry, symbol)?
            .ok_or_else(|| ChainError::revert(format!("{}: unknown asset {}", self.kind(bridge), symbol)))
    }

    fn kind(&self, address: &Address) -> &'static str {
        self.state
            .contract(address)
            .map(Contract::kind)
            .unwrap_or("contract")
    }

    /// `BridgeExample.deposit`: mints `asset` to the bridge contract itself.
    pub fn bridge_example_deposit(
        &mut self,
        bridge: Address,
        asset: String,
        msg: Vec<u8>,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<U256, ChainError> {
        let entry = self.mint_gateway_of(&bridge, &asset)?;
        let p_hash = crypto::payload_hash(&[Token::String(asset), Token::Bytes(msg)]);
        self.gateway_mint(entry.gateway, bridge, p_hash, amount, n_hash, signature)
    }

    /// `BridgeExample.withdraw`: burns from the bridge's own balance towards `to`.
    pub fn bridge_example_withdraw(
        &mut self,
        bridge: Address,
        asset: String,
        to: Vec<u8>,
        amount: U256,
    ) -> Result<U256, ChainError> {
        let entry = self.mint_gateway_of(&bridge, &asset)?;
        self.gateway_burn(entry.gateway, bridge, to, amount)
    }

    /// `Adapter.deposit`: mints BTC to the adapter.
    pub fn adapter_deposit(
        &mut self,
        adapter: Address,
        msg: Vec<u8>,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<U256, ChainError> {
        let entry = self.mint_gateway_of(&adapter, "BTC")?;
        let p_hash = crypto::payload_hash(&[Token::Bytes(msg)]);
        self.gateway_mint(entry.gateway, adapter, p_hash, amount, n_hash, signature)
    }

    /// `BasicBridge.mint`: mints through the gateway and forwards to `recipient`.
    pub fn basic_bridge_mint(
        &mut self,
        bridge: Address,
        symbol: String,
        recipient: Address,
        amount: U256,
        n_hash: H256,
        signature: &[u8],
    ) -> Result<U256, ChainError> {
        let entry = self.mint_gateway_of(&bridge, &symbol)?;
        let p_hash = crypto::payload_hash(&[Token::String(symbol), Token::Address(recipient)]);
        let minted = self.gateway_mint(entry.gateway, bridge, p_hash, amount, n_hash, signature)?;
        self.token_transfer(entry.token, bridge, recipient, minted)?;
        Ok(minted)
    }

    /// `BasicBridge.burn`: pulls the caller's tokens and burns them towards `to`.
    pub fn basic_bridge_burn(
        &mut self,
        bridge: Address,
        caller: Address,
        symbol: String,
        to: String,
        amount: U256,
    ) -> Result<U256, ChainError> {
        let entry = self.mint_gateway_of(&bridge, &symbol)?;
        self.token_transfer_from(entry.token, bridge, caller, bridge, amount)?;
        self.gateway_burn(entry.gateway, bridge, to.into_bytes(), amount)
    }

    // ========================================================================
    // DISPATCH BY NAME
    // ========================================================================

    /// Calls `method` on `to` with ABI values, as the transaction sender.
    ///
    /// This is the entry point the SDK uses for user supplied contract calls.
    /// Every state-changing method returns the processed amount as a single
    /// `uint256`.
    pub fn call(
        &mut self,
        to: Address,
        method: &str,
        args: Vec<Token>,
    ) -> Result<Vec<Token>, ChainError> {
        let caller = self.sender;
        let kind = self.state.contract(&to)?.call_target();
        let mut args = ArgReader::new(method, args);

        let amount = match (kind, method) {
            (CallTarget::BridgeExample, "deposit") => {
                let asset = args.string()?;
                let msg = args.bytes()?;
                let amount = args.uint()?;
                let n_hash = args.fixed_bytes()?;
                let sig = args.bytes()?;
                args.finish()?;
                self.bridge_example_deposit(to, asset, msg, amount, n_hash, &sig)?
            }
            (CallTarget::BridgeExample, "withdraw") => {
                let asset = args.string()?;
                let _msg = args.bytes()?;
                let recipient = args.bytes()?;
                let amount = args.uint()?;
                args.finish()?;
                self.bridge_example_withdraw(to, asset, recipient, amount)?
            }
            (CallTarget::Adapter, "deposit") => {
                let msg = args.bytes()?;
                let amount = args.uint()?;
                let n_hash = args.fixed_bytes()?;
                let sig = args.bytes()?;
                args.finish()?;
                self.adapter_deposit(to, msg, amount, n_hash, &sig)?
            }
            (CallTarget::BasicBridge, "mint") => {
                let symbol = args.string()?;
                let recipient = args.address()?;
                let amount = args.uint()?;
                let n_hash = args.fixed_bytes()?;
                let sig = args.bytes()?;
                args.finish()?;
                self.basic_bridge_mint(to, symbol, recipient, amount, n_hash, &sig)?
            }
            (CallTarget::BasicBridge, "burn") => {
                let symbol = args.string()?;
                let recipient = args.string()?;
                let amount = args.uint()?;
                args.finish()?;
                self.basic_bridge_burn(to, caller, symbol, recipient, amount)?
            }
            (CallTarget::MintGateway, "mint") => {
                let p_hash = args.fixed_bytes()?;
                let amount = args.uint()?;
                let n_hash = args.fixed_bytes()?;
                let sig = args.bytes()?;
                args.finish()?;
                self.gateway_mint(to, caller, p_hash, amount, n_hash, &sig)?
            }
            (CallTarget::MintGateway, "burn") => {
                let recipient = args.bytes()?;
                let amount = args.uint()?;
                args.finish()?;
                self.gateway_burn(to, caller, recipient, amount)?
            }
            (CallTarget::LockGateway, "lock") => {
                let recipient_address = args.string()?;
                let recipient_chain = args.string()?;
                let payload = args.bytes()?;
                let amount = args.uint()?;
                args.finish()?;
                self.gateway_lock(to, caller, recipient_address, recipient_chain, payload, amount)?
            }
            (CallTarget::LockGateway, "release") => {
                let p_hash = args.fixed_bytes()?;
                let amount = args.uint()?;
                let n_hash = args.fixed_bytes()?;
                let sig = args.bytes()?;
                args.finish()?;
                self.gateway_release(to, caller, p_hash, amount, n_hash, &sig)?
            }
            (CallTarget::Token, "transfer") => {
                let recipient = args.address()?;
                let amount = args.uint()?;
                args.finish()?;
                self.token_transfer(to, caller, recipient, amount)?;
                amount
            }
            (CallTarget::Token, "approve") => {
                let spender = args.address()?;
                let amount = args.uint()?;
                args.finish()?;
                self.token_approve(to, caller, spender, amount)?;
                amount
            }
            _ => {
                return Err(ChainError::UnknownMethod {
                    address: to,
                    method: method.to_string(),
                })
            }
        };

        Ok(vec![Token::Uint(amount)])
    }
}

/// Contract kinds reachable through [`Tx::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallTarget {
    BridgeExample,
    Adapter,
    BasicBridge,
    MintGateway,
    LockGateway,
    Token,
    Other,
}

impl Contract {
    fn call_target(&self) -> CallTarget {
        match self {
            Contract::BridgeExample { .. } => CallTarget::BridgeExample,
            Contract::Adapter { .. } => CallTarget::Adapter,
            Contract::BasicBridge { .. } => CallTarget::BasicBridge,
            Contract::MintGateway(_) => CallTarget::MintGateway,
            Contract::LockGateway(_) => CallTarget::LockGateway,
            Contract::Token(_) => CallTarget::Token,
            _ => CallTarget::Other,
        }
    }
}

/// Positional argument decoder for [`Tx::call`].
struct ArgReader {
    method: String,
    position: usize,
    args: std::vec::IntoIter<Token>,
}

impl ArgReader {
    fn new(method: &str, args: Vec<Token>) -> Self {
        Self {
            method: method.to_string(),
            position: 0,
            args: args.into_iter(),
        }
    }

    fn next<T>(
        &mut self,
        expected: &str,
        convert: impl FnOnce(Token) -> Option<T>,
    ) -> Result<T, ChainError> {
        let position = self.position;
        self.position += 1;
        let token = self.args.next().ok_or_else(|| ChainError::InvalidArguments {
            method: self.method.clone(),
            reason: format!("missing argument {} ({})", position, expected),
        })?;
        let found = token.type_name();
        convert(token).ok_or_else(|| ChainError::InvalidArguments {
            method: self.method.clone(),
            reason: format!("argument {} should be {}, got {}", position, expected, found),
        })
    }

    fn string(&mut self) -> Result<String, ChainError> {
        self.next("string", Token::into_string)
    }

    fn bytes(&mut self) -> Result<Vec<u8>, ChainError> {
        self.next("bytes", Token::into_bytes)
    }

    fn uint(&mut self) -> Result<U256, ChainError> {
        self.next("uint256", Token::into_uint)
    }

    fn fixed_bytes(&mut self) -> Result<H256, ChainError> {
        self.next("bytes32", Token::into_fixed_bytes)
    }

    fn address(&mut self) -> Result<Address, ChainError> {
        self.next("address", Token::into_address)
    }

    fn finish(mut self) -> Result<(), ChainError> {
        if self.args.next().is_some() {
            return Err(ChainError::InvalidArguments {
                method: self.method,
                reason: format!("expected {} arguments", self.position),
            });
        }
        Ok(())
    }
}
