//! 规范骨骼名 - 把不同绑定的骨骼命名统一到一套枚举
//!
//! 解析流程（只在加载时执行一次）：
//! 1. 小写，去掉命名空间（`:` `|` `/` 之前的部分）和常见前缀
//! 2. 去掉分隔符 ` ` `_` `-` `.`
//! 3. 先精确匹配别名，再做子串匹配
//!
//! 名称中含手指关键字的骨骼永远不参与匹配，避免把指节当成手腕。

use once_cell::sync::Lazy;

/// 左右侧
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// 关节类别（约束按类别配置）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointClass {
    Shoulder,
    Elbow,
    Hip,
    Knee,
    Other,
}

/// 规范骨骼名
///
/// 手臂链：UpperArm（肩关节）→ LowerArm（肘关节）→ Hand
/// 腿部链：UpperLeg（髋关节）→ LowerLeg（膝关节）→ Foot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoneName {
    Hips,
    Spine,
    Chest,
    Neck,
    Head,
    LeftClavicle,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightClavicle,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
}

/// 手指关键字
const FINGER_TOKENS: [&str; 6] = ["thumb", "index", "middle", "ring", "pinky", "little"];

/// 命名空间之后仍需去掉的前缀（已小写）
const STRIP_PREFIXES: [&str; 9] = [
    "mixamorig",
    "valvebiped.",
    "bip001",
    "bip01",
    "j_bip_c_",
    "j_bip_",
    "def-",
    "def_",
    "org-",
];

/// 子串匹配的最短别名长度，过短的别名（如 `larm`）只做精确匹配
const MIN_SUBSTRING_ALIAS: usize = 5;

impl BoneName {
    pub const COUNT: usize = 21;

    pub const ALL: [BoneName; Self::COUNT] = [
        BoneName::Hips,
        BoneName::Spine,
        BoneName::Chest,
        BoneName::Neck,
        BoneName::Head,
        BoneName::LeftClavicle,
        BoneName::LeftUpperArm,
        BoneName::LeftLowerArm,
        BoneName::LeftHand,
        BoneName::RightClavicle,
        BoneName::RightUpperArm,
        BoneName::RightLowerArm,
        BoneName::RightHand,
        BoneName::LeftUpperLeg,
        BoneName::LeftLowerLeg,
        BoneName::LeftFoot,
        BoneName::LeftToes,
        BoneName::RightUpperLeg,
        BoneName::RightLowerLeg,
        BoneName::RightFoot,
        BoneName::RightToes,
    ];

    /// 在规范表中的下标
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn side(self) -> Option<Side> {
        use BoneName::*;
        match self {
            LeftClavicle | LeftUpperArm | LeftLowerArm | LeftHand | LeftUpperLeg | LeftLowerLeg
            | LeftFoot | LeftToes => Some(Side::Left),
            RightClavicle | RightUpperArm | RightLowerArm | RightHand | RightUpperLeg
            | RightLowerLeg | RightFoot | RightToes => Some(Side::Right),
            _ => None,
        }
    }

    pub fn is_arm(self) -> bool {
        use BoneName::*;
        matches!(
            self,
            LeftClavicle | LeftUpperArm | LeftLowerArm | LeftHand | RightClavicle | RightUpperArm
                | RightLowerArm | RightHand
        )
    }

    pub fn is_leg(self) -> bool {
        use BoneName::*;
        matches!(
            self,
            LeftUpperLeg | LeftLowerLeg | LeftFoot | LeftToes | RightUpperLeg | RightLowerLeg
                | RightFoot | RightToes
        )
    }

    pub fn joint_class(self) -> JointClass {
        use BoneName::*;
        match self {
            LeftUpperArm | RightUpperArm => JointClass::Shoulder,
            LeftLowerArm | RightLowerArm => JointClass::Elbow,
            LeftUpperLeg | RightUpperLeg => JointClass::Hip,
            LeftLowerLeg | RightLowerLeg => JointClass::Knee,
            _ => JointClass::Other,
        }
    }

    /// 别名列表（已规范化：小写、无分隔符）
    pub fn aliases(self) -> &'static [String] {
        &ALIAS_TABLE[self.index()]
    }

    /// 解析单个名称（用于动画轨道等零散名称）
    pub fn resolve(raw: &str) -> Option<BoneName> {
        let name = normalize_bone_name(raw);
        if is_finger_name(&name) {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.aliases().iter().any(|a| *a == name))
            .or_else(|| {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|b| b.substring_match(&name))
            })
    }

    /// 子串匹配（跳过过短的别名）
    pub(crate) fn substring_match(self, normalized: &str) -> bool {
        self.aliases()
            .iter()
            .filter(|a| a.len() >= MIN_SUBSTRING_ALIAS)
            .any(|a| normalized.contains(a.as_str()))
    }

    /// 侧别词干，按左右展开为四种写法
    fn side_stems(self) -> Option<(Side, &'static [&'static str])> {
        use BoneName::*;
        let stems: &'static [&'static str] = match self {
            LeftClavicle | RightClavicle => &["shoulder", "clavicle", "collar"],
            LeftUpperArm | RightUpperArm => &["arm", "upperarm", "uparm"],
            LeftLowerArm | RightLowerArm => &["forearm", "lowerarm", "elbow"],
            LeftHand | RightHand => &["hand", "wrist"],
            LeftUpperLeg | RightUpperLeg => &["upleg", "upperleg", "thigh", "hip"],
            LeftLowerLeg | RightLowerLeg => &["leg", "lowerleg", "knee", "shin", "calf"],
            LeftFoot | RightFoot => &["foot", "ankle"],
            LeftToes | RightToes => &["toebase", "toes", "toe"],
            _ => return None,
        };
        self.side().map(|side| (side, stems))
    }

    fn center_aliases(self) -> &'static [&'static str] {
        use BoneName::*;
        match self {
            Hips => &["hips", "pelvis"],
            Spine => &["spine", "abdomen", "spine01"],
            Chest => &["chest", "spine1", "spine2", "upperchest", "spine02", "spine03"],
            Neck => &["neck", "neck1"],
            Head => &["head"],
            _ => &[],
        }
    }
}

/// 规范别名表，按 `BoneName::index()` 排列
static ALIAS_TABLE: Lazy<Vec<Vec<String>>> = Lazy::new(|| {
    BoneName::ALL
        .iter()
        .map(|bone| match bone.side_stems() {
            Some((side, stems)) => {
                let (long, short) = match side {
                    Side::Left => ("left", "l"),
                    Side::Right => ("right", "r"),
                };
                let mut aliases = Vec::with_capacity(stems.len() * 4);
                for stem in stems {
                    aliases.push(format!("{long}{stem}"));
                    aliases.push(format!("{stem}{long}"));
                    aliases.push(format!("{short}{stem}"));
                    aliases.push(format!("{stem}{short}"));
                }
                aliases
            }
            None => bone.center_aliases().iter().map(|s| s.to_string()).collect(),
        })
        .collect()
});

/// 规范化骨骼名：小写、去命名空间与前缀、去分隔符
pub fn normalize_bone_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut name = lower
        .rsplit(|c| c == ':' || c == '|' || c == '/')
        .next()
        .unwrap_or("");

    for prefix in STRIP_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
            break;
        }
    }

    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '.'))
        .collect()
}

/// 是否为手指骨骼（输入为规范化后的名称）
pub fn is_finger_name(normalized: &str) -> bool {
    FINGER_TOKENS.iter().any(|t| normalized.contains(t))
}
