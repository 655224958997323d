//! ICS-23 proof specifications carried inside a Tendermint client state.

/// `cosmos.ics23.v1.HashOp`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum HashOp {
    NoHash = 0,
    Sha256 = 1,
    Sha512 = 2,
    Keccak = 3,
    Ripemd160 = 4,
    Bitcoin = 5,
    Sha512256 = 6,
}

/// `cosmos.ics23.v1.LengthOp`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum LengthOp {
    NoPrefix = 0,
    VarProto = 1,
}

/// `cosmos.ics23.v1.LeafOp`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct LeafOp {
    #[prost(enumeration = "HashOp", tag = "1")]
    pub hash: i32,
    #[prost(enumeration = "HashOp", tag = "2")]
    pub prehash_key: i32,
    #[prost(enumeration = "HashOp", tag = "3")]
    pub prehash_value: i32,
    #[prost(enumeration = "LengthOp", tag = "4")]
    pub length: i32,
    #[prost(bytes = "vec", tag = "5")]
    pub prefix: Vec<u8>,
}

/// `cosmos.ics23.v1.InnerSpec`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct InnerSpec {
    #[prost(int32, repeated, tag = "1")]
    pub child_order: Vec<i32>,
    #[prost(int32, tag = "2")]
    pub child_size: i32,
    #[prost(int32, tag = "3")]
    pub min_prefix_length: i32,
    #[prost(int32, tag = "4")]
    pub max_prefix_length: i32,
    #[prost(bytes = "vec", tag = "5")]
    pub empty_child: Vec<u8>,
    #[prost(enumeration = "HashOp", tag = "6")]
    pub hash: i32,
}

/// `cosmos.ics23.v1.ProofSpec`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ProofSpec {
    #[prost(message, optional, tag = "1")]
    pub leaf_spec: Option<LeafOp>,
    #[prost(message, optional, tag = "2")]
    pub inner_spec: Option<InnerSpec>,
    #[prost(int32, tag = "3")]
    pub max_depth: i32,
    #[prost(int32, tag = "4")]
    pub min_depth: i32,
    #[prost(bool, tag = "5")]
    pub prehash_key_before_comparison: bool,
}

fn sha256_leaf() -> LeafOp {
    LeafOp {
        hash: HashOp::Sha256 as i32,
        prehash_key: HashOp::NoHash as i32,
        prehash_value: HashOp::Sha256 as i32,
        length: LengthOp::VarProto as i32,
        prefix: vec![0],
    }
}

/// Spec for IAVL store proofs.
pub fn iavl_spec() -> ProofSpec {
    ProofSpec {
        leaf_spec: Some(sha256_leaf()),
        inner_spec: Some(InnerSpec {
            child_order: vec![0, 1],
            child_size: 33,
            min_prefix_length: 4,
            max_prefix_length: 12,
            empty_child: Vec::new(),
            hash: HashOp::Sha256 as i32,
        }),
        max_depth: 0,
        min_depth: 0,
        prehash_key_before_comparison: false,
    }
}

/// Spec for the simple Merkle tree over store roots.
pub fn tendermint_spec() -> ProofSpec {
    ProofSpec {
        leaf_spec: Some(sha256_leaf()),
        inner_spec: Some(InnerSpec {
            child_order: vec![0, 1],
            child_size: 32,
            min_prefix_length: 1,
            max_prefix_length: 1,
            empty_child: Vec::new(),
            hash: HashOp::Sha256 as i32,
        }),
        max_depth: 0,
        min_depth: 0,
        prehash_key_before_comparison: false,
    }
}

/// Proof specs of a Cosmos SDK chain: IAVL then Tendermint.
pub fn sdk_specs() -> Vec<ProofSpec> {
    vec![iavl_spec(), tendermint_spec()]
}
